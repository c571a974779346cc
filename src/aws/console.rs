// src/aws/console.rs
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::sts::StsCredentials;
use crate::error::{Error, Result};

const DEFAULT_CONSOLE: &str = "https://console.aws.amazon.com/";

#[derive(Deserialize)]
struct SigninResponse {
    #[serde(rename = "SigninToken")]
    signin_token: String,
}

/// Client for the AWS federation endpoint.
#[derive(Debug, Clone)]
pub struct Federation {
    client: Client,
    endpoint: Url,
}

impl Federation {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid federation url [{}]: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::federation("failed to request federation", e))?;
        Ok(Self { client, endpoint })
    }

    /// Exchanges STS credentials for a console sign-in token.
    pub async fn signin_token(&self, creds: &StsCredentials) -> Result<String> {
        let session = json!({
            "sessionId": creds.access_key,
            "sessionKey": creds.secret_key,
            "sessionToken": creds.security_token,
        })
        .to_string();

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("Action", "getSigninToken")
            .append_pair("Session", &session);
        debug!("GET {}?Action=getSigninToken", self.endpoint);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::federation("failed to request federation", e))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::federation("failed to receive federation response body", e))?;
        let token: SigninResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::federation("failed to unmarshal sign-in token", e))?;
        Ok(token.signin_token)
    }

    /// Console login URL for a sign-in token. `region` picks the regional
    /// console.
    pub fn login_url(&self, issuer: &str, region: Option<&str>, signin_token: &str) -> String {
        let destination = match region.filter(|r| !r.is_empty()) {
            Some(region) => format!("https://{}.console.aws.amazon.com/", region),
            None => DEFAULT_CONSOLE.to_string(),
        };

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("Action", "login")
            .append_pair("Issuer", issuer)
            .append_pair("Destination", &destination)
            .append_pair("SigninToken", signin_token);
        url.to_string()
    }
}

/// Hands the URL to the desktop browser. Failures are only logged.
pub fn open_in_browser(url: &str) {
    if let Err(e) = open::that(url) {
        warn!("cannot open browser: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> StsCredentials {
        StsCredentials {
            access_key: "AKIA".to_string(),
            secret_key: "s3cr3t".to_string(),
            security_token: "t0k3n".to_string(),
        }
    }

    fn federation(server: &MockServer) -> Federation {
        Federation::new(
            &format!("{}/federation", server.uri()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn signin_token_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/federation"))
            .and(query_param("Action", "getSigninToken"))
            .and(query_param(
                "Session",
                r#"{"sessionId":"AKIA","sessionKey":"s3cr3t","sessionToken":"t0k3n"}"#,
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "SigninToken": "abc/def+=" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = federation(&server).signin_token(&creds()).await.unwrap();
        assert_eq!(token, "abc/def+=");
    }

    #[tokio::test]
    async fn unexpected_body_fails_to_unmarshal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("<html>bad</html>"))
            .mount(&server)
            .await;

        let err = federation(&server)
            .signin_token(&creds())
            .await
            .unwrap_err();
        assert!(
            err.to_string().starts_with("failed to unmarshal sign-in token"),
            "{}",
            err
        );
    }

    #[test]
    fn login_url_encodes_its_parameters() {
        let federation = Federation::new(
            "https://signin.aws.amazon.com/federation",
            Duration::from_secs(2),
        )
        .unwrap();

        let url = federation.login_url("https://vault.example.com", None, "abc/def+=");
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("Action".to_string(), "login".to_string()),
                ("Issuer".to_string(), "https://vault.example.com".to_string()),
                ("Destination".to_string(), DEFAULT_CONSOLE.to_string()),
                ("SigninToken".to_string(), "abc/def+=".to_string()),
            ]
        );
        assert!(url.starts_with("https://signin.aws.amazon.com/federation?Action=login&"));

        let url = federation.login_url("https://vault.example.com", Some("eu-west-1"), "t");
        assert!(url.contains("eu-west-1.console.aws.amazon.com"), "{}", url);
    }
}
