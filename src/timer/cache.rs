// src/timer/cache.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Last known TTL of a token, keyed by the secrets service address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub address: String,
    pub token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub ttl: Duration,
}

impl CacheEntry {
    /// `None` when the stored values are too far out of range to compute.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.ttl.checked_sub(&now.signed_duration_since(self.updated))
    }
}

/// The cache stores epoch milliseconds, so timestamps are cut to the same
/// precision before they are stored or compared.
fn to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(skip)]
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl TokenCache {
    /// Loads the cache file. A missing or undecodable file is an empty
    /// cache.
    pub fn load(path: &Path) -> Self {
        let entries = fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str::<TokenCache>(&contents).ok())
            .map(|cache| cache.entries)
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Writes the cache file with mode `0600`; it holds the token.
    pub fn save(&self) -> io::Result<()> {
        let contents = serde_json::to_string(self)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(contents.as_bytes())
    }

    /// Removes the cache file; removing an absent file is fine.
    pub fn clear(path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    #[cfg(test)]
    pub fn get(&self, address: &str) -> Option<&CacheEntry> {
        self.entries.get(address)
    }

    /// Remaining TTL for `token` at `address` as of `now`, refreshing the
    /// entry in memory on a hit. Expired or foreign-token entries are
    /// misses.
    pub fn lookup(&mut self, address: &str, token: &str, now: DateTime<Utc>) -> Option<Duration> {
        let now = to_millis(now);
        let cached = self.entries.get(address)?;
        if cached.token != token {
            return None;
        }

        let remaining = cached.remaining(now)?;
        if remaining <= Duration::zero() {
            return None;
        }

        self.update(address, token, now, remaining);
        Some(remaining)
    }

    pub fn update(&mut self, address: &str, token: &str, updated: DateTime<Utc>, ttl: Duration) {
        self.entries.insert(
            address.to_string(),
            CacheEntry {
                address: address.to_string(),
                token: token.to_string(),
                updated: to_millis(updated),
                ttl,
            },
        );
    }
}

mod duration_millis {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ttl.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        Duration::try_milliseconds(millis)
            .ok_or_else(|| D::Error::custom(format!("ttl out of range: {}", millis)))
    }
}
