// src/aws/mod.rs
mod console;
mod profile;
mod sts;

pub use sts::{ExportShell, BASH_STS_ALIAS};

use std::path::PathBuf;

use chrono::Local;
use tracing::info;

use crate::config::{Environment, PalConfig};
use crate::error::{Error, Result};
use crate::vault::VaultClient;
use console::{open_in_browser, Federation};
use sts::StsCredentials;

/// Export statements for the STS credentials of `role`.
pub async fn export_sts(
    client: &VaultClient,
    engine: &str,
    role: Option<&str>,
    shell: ExportShell,
) -> Result<String> {
    let role = role.filter(|r| !r.is_empty()).ok_or_else(|| {
        Error::Validation("missing argument: role name to use for aws sts".to_string())
    })?;
    let creds = StsCredentials::fetch(client, engine, role).await?;
    Ok(creds.export(shell))
}

/// Console sign-in URL for the STS credentials of `role`; opened in the
/// browser unless `suppress_open`.
pub async fn console_url(
    client: &VaultClient,
    env: &Environment,
    config: &PalConfig,
    engine: &str,
    role: &str,
    suppress_open: bool,
) -> Result<String> {
    let creds = StsCredentials::fetch(client, engine, role).await?;
    let federation = Federation::new(&config.federation_url, config.request_timeout())?;
    let token = federation.signin_token(&creds).await?;

    let issuer = env.vault_addr.as_deref().unwrap_or_default();
    let url = federation.login_url(issuer, env.aws_region.as_deref(), &token);
    if !suppress_open {
        open_in_browser(&url);
    }
    Ok(url)
}

/// Stores the STS credentials of `role` as profile `profile` in the AWS
/// credentials file.
pub async fn write_credentials(
    client: &VaultClient,
    env: &Environment,
    config: &PalConfig,
    role: &str,
    profile: &str,
) -> Result<PathBuf> {
    let path = profile::credentials_path(&env.home()?)?;
    let creds = StsCredentials::fetch(client, &config.aws_engine, role).await?;
    profile::write_profile(&path, profile, &creds, &config.aws_region, Local::now())?;

    info!(
        "AWS creds written to: {}. Use them with `aws --profile {} sts get-caller-identity`",
        path.display(),
        profile
    );
    Ok(path)
}
