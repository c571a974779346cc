// src/timer/mod.rs
//! Remaining token lifetime for the shell prompt.
//!
//! Runs on every prompt redraw, so the common path is a cache hit with no
//! network at all. Failures never reach the prompt as text.

mod cache;
mod probe;
mod render;

use cache::TokenCache;
use probe::is_reachable;
use render::{render, RenderMode};

use std::process::ExitCode;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::{Environment, PalConfig, TimerConfig};
use crate::error::{Error, Result};
use crate::vault::VaultClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    Remaining(Duration),
    /// The service host did not resolve in time.
    Unreachable,
    /// Reachable, but no positive TTL could be obtained.
    Unavailable,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimerOptions {
    pub query: bool,
    pub clear_cache: bool,
    pub bash: bool,
}

/// Remaining TTL of `token` at `endpoint`, from the cache when it still
/// holds time, otherwise from a live self-lookup. The cache file is
/// rewritten on every positive answer.
pub async fn remaining_ttl(
    cache: &mut TokenCache,
    endpoint: &str,
    token: &str,
    now: DateTime<Utc>,
    config: &TimerConfig,
) -> TtlStatus {
    if let Some(remaining) = cache.lookup(endpoint, token, now) {
        persist(cache);
        return TtlStatus::Remaining(remaining);
    }

    if !is_reachable(endpoint, config.probe_timeout()).await {
        return TtlStatus::Unreachable;
    }

    let client = match VaultClient::new(endpoint, token, Some(config.lookup_timeout())) {
        Ok(client) => client,
        Err(e) => {
            debug!("timer: {}", e);
            return TtlStatus::Unavailable;
        }
    };

    let info = match client.lookup_self().await {
        Ok(info) => info,
        Err(e) => {
            if e.is_timeout() {
                eprintln!("unset your VAULT_ADDR variable, {} can't be reached", endpoint);
            }
            debug!("timer: {}", e);
            return TtlStatus::Unavailable;
        }
    };

    match info.ttl {
        Some(seconds) if seconds > 0 => {
            let ttl = Duration::seconds(seconds);
            cache.update(endpoint, token, now, ttl);
            persist(cache);
            TtlStatus::Remaining(ttl)
        }
        _ => TtlStatus::Unavailable,
    }
}

fn persist(cache: &TokenCache) {
    if let Err(e) = cache.save() {
        debug!("timer: cannot write cache: {}", e);
    }
}

/// The `PS1` assignment that hooks the timer into a bash prompt, or `None`
/// when the prompt already calls it.
pub fn prompt_string(program: &str, ps1: Option<&str>) -> Option<String> {
    let hook = format!("{} timer", program);
    if ps1.is_some_and(|ps1| ps1.contains(&hook)) {
        return None;
    }
    Some(format!("PS1=\"\\$({})$PS1\"", hook))
}

pub async fn run_timer(
    options: TimerOptions,
    env: &Environment,
    config: &PalConfig,
    program: &str,
) -> Result<ExitCode> {
    if options.bash {
        if let Some(line) = prompt_string(program, env.ps1.as_deref()) {
            println!("{}", line);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let cache_file = config.timer.cache_file();
    if options.clear_cache {
        TokenCache::clear(&cache_file)
            .map_err(|e| Error::io("cannot remove timer cache", &cache_file, e))?;
        return Ok(ExitCode::SUCCESS);
    }

    let endpoint = match env.vault_addr.as_deref() {
        Some(addr) => addr,
        None => return Ok(ExitCode::SUCCESS),
    };

    let token = match env.current_token() {
        Ok(token) => token.unwrap_or_default(),
        Err(e) => {
            eprintln!("get token failed: {}", e);
            return Ok(ExitCode::SUCCESS);
        }
    };
    if token.is_empty() {
        eprintln!("token empty");
        return Ok(ExitCode::SUCCESS);
    }

    let mut cache = TokenCache::load(&cache_file);
    let mode = if options.query {
        RenderMode::Query
    } else {
        RenderMode::Display
    };

    match remaining_ttl(&mut cache, endpoint, &token, Utc::now(), &config.timer).await {
        TtlStatus::Remaining(ttl) => {
            print!("{}", render(ttl, &config.label(endpoint), mode));
            Ok(ExitCode::SUCCESS)
        }
        TtlStatus::Unreachable => Ok(ExitCode::SUCCESS),
        TtlStatus::Unavailable => Ok(ExitCode::FAILURE),
    }
}
