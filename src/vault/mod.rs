// src/vault/mod.rs
mod secret;
mod token_helper;

#[cfg(test)]
pub mod testutil;

pub use secret::{Secret, SecretAuth, TokenInfo};
pub use token_helper::TokenHelper;

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

const LOOKUP_SELF_PATH: &str = "auth/token/lookup-self";

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid vault address provided. Check environment variable [VAULT_ADDR]: {0}")]
    InvalidAddress(#[from] url::ParseError),

    #[error("error creating vault client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{}", format_api_error(.method, .url, .status, .errors))]
    Api {
        method: String,
        url: String,
        status: u16,
        errors: Vec<String>,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no data returned from [{0}]")]
    Empty(String),
}

impl VaultError {
    pub fn is_network(&self) -> bool {
        matches!(self, VaultError::Timeout { .. } | VaultError::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VaultError::Timeout { .. })
    }
}

fn format_api_error(method: &str, url: &str, status: &u16, errors: &[String]) -> String {
    let mut out = format!(
        "Error making API request.\n\nURL: {} {}\nCode: {}. Errors:\n",
        method, url, status
    );
    for error in errors {
        out.push_str("\n* ");
        out.push_str(error);
    }
    out
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Authenticated client for the secrets service HTTP API.
#[derive(Debug, Clone)]
pub struct VaultClient {
    client: Client,
    address: Url,
    token: String,
}

impl VaultClient {
    pub fn new(address: &str, token: &str, timeout: Option<Duration>) -> Result<Self, VaultError> {
        let address = Url::parse(address)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(VaultError::Client)?;

        Ok(Self {
            client,
            address,
            token: token.trim().to_string(),
        })
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.address.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET /v1/<path>`. A missing secret is `Ok(None)`.
    pub async fn read(&self, path: &str) -> Result<Option<Secret>, VaultError> {
        self.send(Method::GET, path, None).await
    }

    /// `PUT /v1/<path>` with a JSON body. Writes that return no content are
    /// `Ok(None)`.
    pub async fn write(&self, path: &str, body: &Value) -> Result<Option<Secret>, VaultError> {
        trace!("write body for {}: {}", path, body);
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn lookup_self(&self) -> Result<TokenInfo, VaultError> {
        let secret = self
            .read(LOOKUP_SELF_PATH)
            .await?
            .ok_or_else(|| VaultError::Empty(LOOKUP_SELF_PATH.to_string()))?;
        Ok(TokenInfo::from_secret(&secret))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Secret>, VaultError> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("X-Vault-Token", &self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                VaultError::Timeout { url: url.clone() }
            } else {
                VaultError::Transport {
                    url: url.clone(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status.is_success() {
            let secret = response.json::<Secret>().await.map_err(|e| {
                if e.is_timeout() {
                    VaultError::Timeout { url: url.clone() }
                } else {
                    VaultError::Decode {
                        url: url.clone(),
                        source: e,
                    }
                }
            })?;
            return Ok(Some(secret));
        }

        let body = response.text().await.unwrap_or_default();
        let errors = serde_json::from_str::<ErrorResponse>(&body)
            .map(|r| r.errors)
            .unwrap_or_default();
        if status == StatusCode::NOT_FOUND && errors.is_empty() {
            return Ok(None);
        }

        Err(VaultError::Api {
            method: method.to_string(),
            url,
            status: status.as_u16(),
            errors,
        })
    }
}
