// Stubs of the secrets service endpoints used across the test suites.
use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::VaultClient;

pub const CA: &str = include_str!("testdata/ca.pem");
pub const CERT: &str = include_str!("testdata/cert.pem");
pub const PRIVATE_KEY: &str = include_str!("testdata/key.pem");

pub const CLUSTERS_PATH: &str = "kv/data/vaultbro/k8s/clusters";

pub fn client(server: &MockServer) -> VaultClient {
    VaultClient::new(&server.uri(), "1234", None).unwrap()
}

pub async fn mock_lookup_self(server: &MockServer, identity: &str, ttl: i64) {
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "display_name": identity,
                "ttl": ttl,
                "policies": ["default"]
            }
        })))
        .mount(server)
        .await;
}

/// Cluster definition under the KV v2 layout. `None` fields are left out of
/// the stored document entirely.
pub async fn mock_cluster(
    server: &MockServer,
    key: &str,
    name: Option<&str>,
    server_url: Option<&str>,
    pki: Option<&str>,
    alias: Option<&str>,
) {
    let mut data = Map::new();
    for (field, value) in [
        ("name", name),
        ("server", server_url),
        ("pki", pki),
        ("alias", alias),
    ] {
        if let Some(value) = value {
            data.insert(field.to_string(), Value::String(value.to_string()));
        }
    }

    Mock::given(method("GET"))
        .and(path(format!("/v1/{}/{}", CLUSTERS_PATH, key)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "data": data } })),
        )
        .mount(server)
        .await;
}

pub async fn mock_issue(server: &MockServer, pki: &str, role: &str) {
    Mock::given(method("PUT"))
        .and(path(format!("/v1/{}/issue/{}", pki, role)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "issuing_ca": CA,
                "certificate": CERT,
                "private_key": PRIVATE_KEY,
            }
        })))
        .mount(server)
        .await;
}
