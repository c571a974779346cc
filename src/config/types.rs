// config/types.rs
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = ".vaultpal.yaml";
pub const UNKNOWN_LABEL: &str = "[??]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalConfig {
    /// Prompt label per secrets service address.
    pub labels: HashMap<String, String>,
    /// KV path holding one cluster definition per key.
    pub clusters_path: String,
    pub kubeconfig_file: Option<String>,
    pub aws_engine: String,
    pub aws_region: String,
    pub federation_url: String,
    pub request_timeout_ms: u64,
    pub timer: TimerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub probe_timeout_ms: u64,
    pub lookup_timeout_ms: u64,
    pub cache_file: Option<String>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 25,
            lookup_timeout_ms: 1300,
            cache_file: None,
        }
    }
}

impl Default for PalConfig {
    fn default() -> Self {
        Self {
            labels: HashMap::new(),
            clusters_path: "kv/data/vaultbro/k8s/clusters".to_string(),
            kubeconfig_file: None,
            aws_engine: "aws".to_string(),
            aws_region: "eu-central-1".to_string(),
            federation_url: "https://signin.aws.amazon.com/federation".to_string(),
            request_timeout_ms: 2000,
            timer: TimerConfig::default(),
        }
    }
}

impl PalConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .map_err(|e| Error::io("cannot read config file", path, e))?;
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&config_str).map_err(|e| Error::Yaml {
            context: format!("invalid config file [{}]", path.display()),
            source: e,
        })
    }

    /// An explicit path must exist; the default `~/.vaultpal.yaml` is
    /// optional.
    pub fn load(explicit: Option<&Path>, home: Option<&Path>) -> Result<Self> {
        let config = match (explicit, home) {
            (Some(path), _) => Self::load_from_file(path)?,
            (None, Some(home)) => {
                let path = home.join(CONFIG_FILE);
                match fs::metadata(&path) {
                    Ok(_) => Self::load_from_file(&path)?,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
                    Err(e) => return Err(Error::io("cannot read config file", path, e)),
                }
            }
            (None, None) => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clusters_path.trim_matches('/').is_empty() {
            return Err(Error::Config("clusters_path must not be empty".to_string()));
        }
        if self.request_timeout_ms == 0
            || self.timer.probe_timeout_ms == 0
            || self.timer.lookup_timeout_ms == 0
        {
            return Err(Error::Config("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Prompt label for a secrets service address.
    pub fn label(&self, address: &str) -> String {
        label(&self.labels, address)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn kubeconfig_file(&self) -> Option<PathBuf> {
        self.kubeconfig_file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).to_string()))
    }
}

impl TimerConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn cache_file(&self) -> PathBuf {
        match &self.cache_file {
            Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
            None => std::env::temp_dir().join("token-timer.json"),
        }
    }
}

pub fn label(labels: &HashMap<String, String>, address: &str) -> String {
    labels
        .get(address)
        .or_else(|| labels.get(address.trim_end_matches('/')))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}
