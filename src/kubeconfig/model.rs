// src/kubeconfig/model.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub clusters: Vec<ClusterEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contexts: Vec<ContextEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<UserEntry>,
    #[serde(rename = "current-context", default)]
    pub current_context: String,
    /// Top-level keys this tool does not manage (`preferences`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub server: String,
    #[serde(
        rename = "certificate-authority-data",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub certificate_authority_data: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub cluster: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default)]
    pub user: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(
        rename = "client-certificate-data",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub client_certificate_data: String,
    #[serde(
        rename = "client-key-data",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub client_key_data: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// kubectl writes `clusters: null` for empty lists.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

pub trait Named {
    fn name(&self) -> &str;
}

impl Named for ClusterEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ContextEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for UserEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Replaces the entry with the same name in place, or appends it.
pub fn upsert<T: Named>(entries: &mut Vec<T>, entry: T) {
    match entries.iter().position(|e| e.name() == entry.name()) {
        Some(idx) => entries[idx] = entry,
        None => entries.push(entry),
    }
}

fn collapse<T: Named>(entries: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(entries.len());
    for entry in entries {
        upsert(&mut unique, entry);
    }
    unique
}

impl KubeConfig {
    /// Parses an existing document. Empty input is an empty document, and
    /// repeated names collapse to their last occurrence.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: KubeConfig = serde_yaml::from_str(raw).map_err(|e| Error::Yaml {
            context: "unable to unmarshal kube config".to_string(),
            source: e,
        })?;
        config.clusters = collapse(config.clusters);
        config.contexts = collapse(config.contexts);
        config.users = collapse(config.users);
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Yaml {
            context: "cannot marshal kubeconfig file".to_string(),
            source: e,
        })
    }

    /// Merges one cluster/context/user triple and makes the context
    /// current.
    pub fn apply(&mut self, cluster: ClusterEntry, context: ContextEntry, user: UserEntry) {
        self.api_version = "v1".to_string();
        self.kind = "Config".to_string();
        self.current_context = context.name.clone();
        upsert(&mut self.clusters, cluster);
        upsert(&mut self.contexts, context);
        upsert(&mut self.users, user);
    }
}

#[cfg(test)]
impl KubeConfig {
    pub fn cluster(&self, name: &str) -> Option<&ClusterEntry> {
        self.clusters.iter().find(|c| c.name == name)
    }

    pub fn context(&self, name: &str) -> Option<&ContextEntry> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn user(&self, name: &str) -> Option<&UserEntry> {
        self.users.iter().find(|u| u.name == name)
    }
}
