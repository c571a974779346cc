// src/utils/logging.rs
use std::env;
use std::io;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// `RUST_LOG` when it parses, else the `--verbosity` level, else `info`.
fn filter_for(rust_log: Option<&str>, verbosity: &str) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(verbosity).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global subscriber. Everything goes to stderr; stdout is
/// reserved for output meant to be eval'd or piped.
pub fn init(verbosity: &str) {
    let rust_log = env::var("RUST_LOG").ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter_for(rust_log.as_deref(), verbosity))
        .with_writer(io::stderr)
        .with_target(false)
        .finish();

    // already set when running under a test harness
    let _ = tracing::subscriber::set_global_default(subscriber);
}
