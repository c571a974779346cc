// src/aws/sts.rs
use clap::ValueEnum;

use crate::error::{Error, Result};
use crate::vault::{Secret, VaultClient};

/// Bash helper that evals the export statements only when the call succeeded.
pub const BASH_STS_ALIAS: &str = r#"function _vpalsts(){pal_sts_result=$(vaultpal export awssts $1); if [ $? -eq 0 ]; then echo "STS success"; eval "$pal_sts_result"; else echo "--- FAILED STS ---"; echo "${pal_sts_result}"; fi};_vpalsts"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportShell {
    Posix,
    Cmd,
    Powershell,
}

impl Default for ExportShell {
    fn default() -> Self {
        if cfg!(windows) {
            ExportShell::Powershell
        } else {
            ExportShell::Posix
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StsCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub security_token: String,
}

impl StsCredentials {
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let secret_key = secret.verified_string("secret_key", true)?;
        let access_key = secret.verified_string("access_key", true)?;
        let security_token = secret.verified_string("security_token", true)?;
        Ok(Self {
            access_key,
            secret_key,
            security_token,
        })
    }

    /// Reads `<engine>/sts/<role>`.
    pub async fn fetch(client: &VaultClient, engine: &str, role: &str) -> Result<Self> {
        let path = format!("{}/sts/{}", engine.trim_end_matches('/'), role);
        let secret = client
            .read(&path)
            .await
            .map_err(|e| Error::vault("error reading STS credentials from vault", e))?
            .ok_or_else(|| {
                Error::SecretData("error reading STS credentials from vault".to_string())
            })?;
        Self::from_secret(&secret)
    }

    pub fn export(&self, shell: ExportShell) -> String {
        let (key, secret, token) = (&self.access_key, &self.secret_key, &self.security_token);
        match shell {
            ExportShell::Posix => format!(
                "export AWS_ACCESS_KEY_ID={}\nexport AWS_SECRET_ACCESS_KEY={}\nexport AWS_SESSION_TOKEN={}",
                key, secret, token
            ),
            ExportShell::Cmd => format!(
                "set AWS_ACCESS_KEY_ID={}\nset AWS_SECRET_ACCESS_KEY={}\nset AWS_SESSION_TOKEN={}",
                key, secret, token
            ),
            ExportShell::Powershell => format!(
                "$env:AWS_ACCESS_KEY_ID=\"{}\"\n$env:AWS_SECRET_ACCESS_KEY=\"{}\"\n$env:AWS_SESSION_TOKEN=\"{}\"",
                key, secret, token
            ),
        }
    }
}
