// src/timer/probe.rs
use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

/// Resolves the host of `endpoint` within `limit`.
///
/// Literal IP hosts pass without a lookup. Anything that fails to parse,
/// resolve, or resolve in time counts as unreachable.
pub async fn is_reachable(endpoint: &str, limit: Duration) -> bool {
    let url = match Url::parse(endpoint) {
        Ok(url) => url,
        Err(e) => {
            debug!("cannot parse endpoint {}: {}", endpoint, e);
            return false;
        }
    };
    let host = match url.host_str() {
        Some(host) => host.trim_start_matches('[').trim_end_matches(']').to_string(),
        None => return false,
    };
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    let port = url.port_or_known_default().unwrap_or(443);

    let target = host.clone();
    let resolved = resolve_within(limit, move || {
        (target.as_str(), port)
            .to_socket_addrs()
            .map(|mut addrs| addrs.next().is_some())
    })
    .await;

    match resolved {
        Ok(found) => found,
        Err(e) if e.kind() == io::ErrorKind::TimedOut => {
            debug!("resolving {} took longer than {:?}", host, limit);
            false
        }
        Err(e) => {
            debug!("cannot resolve {}: {}", host, e);
            false
        }
    }
}

/// Runs the blocking `resolve` on a detached thread and waits at most
/// `limit` for it. A resolver still stuck in the system lookup is left
/// behind; it does not hold up runtime shutdown or process exit.
async fn resolve_within<F>(limit: Duration, resolve: F) -> io::Result<bool>
where
    F: FnOnce() -> io::Result<bool> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    thread::Builder::new()
        .name("vaultpal-resolve".to_string())
        .spawn(move || {
            let _ = tx.send(resolve());
        })?;

    match timeout(limit, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(io::Error::other("resolver thread stopped")),
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "lookup timed out")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn ip_hosts_skip_resolution() {
        assert!(is_reachable("http://127.0.0.1:8200", Duration::from_millis(1)).await);
        assert!(is_reachable("http://[::1]:8200", Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn unresolvable_hosts_are_unreachable() {
        assert!(!is_reachable("https://vault.invalid", Duration::from_millis(25)).await);
        assert!(!is_reachable("no scheme here", Duration::from_millis(25)).await);
    }

    #[tokio::test]
    async fn fast_resolver_answers() {
        let found = resolve_within(Duration::from_secs(1), || Ok(true)).await;
        assert!(found.unwrap());
    }

    #[test]
    fn hung_resolver_does_not_delay_shutdown() {
        let started = Instant::now();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(resolve_within(Duration::from_millis(25), || {
            thread::sleep(Duration::from_secs(3));
            Ok(true)
        }));
        drop(runtime);

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
    }
}
