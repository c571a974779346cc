// src/token/mod.rs
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::vault::{SecretAuth, TokenHelper, VaultClient};

pub const ROLE_TOKEN_TTL: &str = "1h";

/// Creates a token for `role` on behalf of the current identity.
pub async fn create_role_token(client: &VaultClient, role: &str) -> Result<SecretAuth> {
    let current = client
        .lookup_self()
        .await
        .map_err(|e| Error::vault("error getting own identity", e))?;
    let identity = current.identity()?;
    info!(identity = identity.as_str(), "got your identity");
    debug!(policies = ?current.policies, "current token policies");

    let secret = client
        .write(
            &format!("auth/token/create/{}", role),
            &json!({
                "role_name": role,
                "ttl": ROLE_TOKEN_TTL,
                "display_name": identity,
            }),
        )
        .await
        .map_err(|e| Error::vault("error creating role token", e))?;

    let auth = secret
        .and_then(|s| s.auth)
        .filter(|auth| !auth.client_token.is_empty())
        .ok_or_else(|| Error::SecretData(format!("no token returned for role [{}]", role)))?;
    info!(policies = ?auth.token_policies, "got a role token");
    Ok(auth)
}

/// Replaces the stored token with a fresh token for `role`.
pub async fn switch_role(client: &VaultClient, helper: &TokenHelper, role: &str) -> Result<()> {
    info!(role, "switch to token for");
    let auth = create_role_token(client, role).await?;
    helper
        .store(&auth.client_token)
        .map_err(|e| Error::io("error update token", helper.path(), e))
}
