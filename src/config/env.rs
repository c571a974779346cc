// src/config/env.rs
use std::{env, path::PathBuf};

use url::Url;

use crate::error::{Error, Result};
use crate::vault::TokenHelper;

pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";
pub const ENV_KUBECONFIG_FILE: &str = "VAULTPAL_KUBECONFIG_FILE";
pub const ENV_AWS_REGION: &str = "AWS_REGION";

/// Snapshot of the process environment, taken once at startup so the
/// commands below work on plain values.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub vault_addr: Option<String>,
    pub vault_token: Option<String>,
    pub kubeconfig_file: Option<PathBuf>,
    pub aws_region: Option<String>,
    pub ps1: Option<String>,
    pub home: Option<PathBuf>,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vault_addr: non_empty(ENV_VAULT_ADDR),
            vault_token: non_empty(ENV_VAULT_TOKEN),
            kubeconfig_file: non_empty(ENV_KUBECONFIG_FILE).map(PathBuf::from),
            aws_region: non_empty(ENV_AWS_REGION),
            ps1: env::var("PS1").ok(),
            home: dirs::home_dir(),
        }
    }

    pub fn home(&self) -> Result<PathBuf> {
        self.home
            .clone()
            .ok_or_else(|| Error::Config("user home directory not found".to_string()))
    }

    pub fn token_helper(&self) -> Result<TokenHelper> {
        Ok(TokenHelper::in_home(&self.home()?))
    }

    /// Token resolution as the vault CLI does it: `VAULT_TOKEN` first, then
    /// the token file.
    pub fn current_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.vault_token {
            return Ok(Some(token.trim().to_string()));
        }
        let helper = self.token_helper()?;
        helper
            .get()
            .map_err(|e| Error::io("error getting token", helper.path(), e))
    }
}

/// Address and token needed to talk to the secrets service.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultSettings {
    pub address: String,
    pub token: String,
}

impl VaultSettings {
    pub fn resolve(env: &Environment) -> Result<Self> {
        let address = env.vault_addr.clone().unwrap_or_default();
        match Url::parse(&address) {
            Ok(url) if url.has_host() => {}
            _ => {
                return Err(Error::Config(
                    "invalid vault address provided. Check environment variable [VAULT_ADDR]"
                        .to_string(),
                ))
            }
        }

        let token = env.current_token()?.unwrap_or_default();
        Ok(Self { address, token })
    }
}
