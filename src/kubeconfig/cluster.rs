// src/kubeconfig/cluster.rs
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::vault::VaultClient;

/// A cluster as registered in the secrets service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClusterDefinition {
    pub name: String,
    pub server: String,
    pub pki: String,
    pub alias: String,
}

impl ClusterDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation("cluster name must not be empty".to_string()));
        }
        if self.server.is_empty() {
            return Err(Error::Validation("server must not be empty".to_string()));
        }
        if self.alias.is_empty() {
            if self.pki.is_empty() {
                return Err(Error::Validation("pki must not be empty".to_string()));
            }
        } else if !self.pki.is_empty() {
            return Err(Error::Validation("pki must be empty".to_string()));
        }
        Ok(())
    }

    pub fn is_alias(&self) -> bool {
        !self.alias.is_empty()
    }

    /// Reads `<clusters_path>/<name>` (KV v2 layout).
    pub async fn fetch(client: &VaultClient, clusters_path: &str, name: &str) -> Result<Self> {
        let path = format!("{}/{}", clusters_path.trim_end_matches('/'), name);
        let secret = client
            .read(&path)
            .await
            .map_err(|e| Error::vault("error reading vaultpal config entry for cluster", e))?
            .ok_or_else(|| Error::Validation(format!("cluster [{}] is undefined", name)))?;

        let definition = match secret.get("data") {
            Some(data @ Value::Object(_)) => {
                serde_json::from_value::<ClusterDefinition>(data.clone()).unwrap_or_else(|e| {
                    warn!("cluster definition at [{}] is malformed: {}", path, e);
                    ClusterDefinition::default()
                })
            }
            _ => ClusterDefinition::default(),
        };
        if definition.name.is_empty() {
            warn!(
                "vault path [{}] exists but contains no config for cluster [{}]",
                path, name
            );
        }
        Ok(definition)
    }
}
