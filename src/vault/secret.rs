// src/vault/secret.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Response envelope shared by reads and writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub auth: Option<SecretAuth>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretAuth {
    pub client_token: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub token_policies: Vec<String>,
    #[serde(default)]
    pub lease_duration: u64,
}

impl Secret {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }

    /// Returns the string stored under `key`, failing with a message that
    /// names the key when it is missing, not a string, or (with
    /// `deny_empty`) empty.
    pub fn verified_string(&self, key: &str, deny_empty: bool) -> Result<String> {
        match self.get(key) {
            Some(Value::String(value)) if deny_empty && value.is_empty() => Err(
                Error::SecretData(format!(
                    "item value of [{}] in secret data must not be empty",
                    key
                )),
            ),
            Some(Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(Error::SecretData(format!(
                "item value of [{}] in secret data cannot be converted to string",
                key
            ))),
            None => Err(Error::SecretData(format!(
                "item [{}] does not exist in secret data",
                key
            ))),
        }
    }
}

/// The parts of a token self-lookup this tool cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenInfo {
    pub display_name: Option<String>,
    /// Remaining lifetime in seconds, absent for malformed responses.
    pub ttl: Option<i64>,
    pub policies: Vec<String>,
}

impl TokenInfo {
    pub fn from_secret(secret: &Secret) -> Self {
        let display_name = secret
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        // Vault sends the ttl as a JSON number, some proxies as a string
        let ttl = secret.get("ttl").and_then(|ttl| match ttl {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });
        let policies = secret
            .get("policies")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        TokenInfo {
            display_name,
            ttl,
            policies,
        }
    }

    /// The display name, or the identity error used by every command that
    /// acts on behalf of the caller.
    pub fn identity(&self) -> Result<String> {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(Error::Identity("identity must be not empty/nil".to_string())),
        }
    }
}
