// src/kubeconfig/merge.rs
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use tracing::{debug, info};

use super::certificate;
use super::cluster::ClusterDefinition;
use super::model::{Cluster, ClusterEntry, Context, ContextEntry, KubeConfig, User, UserEntry};
use crate::error::{Error, Result};
use crate::vault::{Secret, VaultClient, VaultError};

/// Issuance TTL in the service's seconds-string format.
pub const CERT_TTL: &str = "3600";

const ROLE_SUFFIXES: [&str; 2] = ["-user", "-admin"];

/// Namespace a role grants access to: the role minus one known suffix.
pub fn derive_namespace(role: &str) -> &str {
    ROLE_SUFFIXES
        .iter()
        .find_map(|suffix| role.strip_suffix(suffix))
        .unwrap_or(role)
}

/// Key material returned by `<pki>/issue/<role>`.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub issuing_ca: String,
    pub certificate: String,
    pub private_key: String,
}

impl IssuedCertificate {
    fn from_secret(secret: &Secret) -> Result<Self> {
        Ok(Self {
            issuing_ca: secret.verified_string("issuing_ca", true)?,
            certificate: secret.verified_string("certificate", true)?,
            private_key: secret.verified_string("private_key", true)?,
        })
    }
}

fn encode(pem: &str) -> String {
    general_purpose::STANDARD.encode(pem.as_bytes())
}

pub struct KubeconfigWriter<'a> {
    client: &'a VaultClient,
    clusters_path: &'a str,
}

impl<'a> KubeconfigWriter<'a> {
    pub fn new(client: &'a VaultClient, clusters_path: &'a str) -> Self {
        Self {
            client,
            clusters_path,
        }
    }

    /// Issues a client certificate for `cluster`/`role` and merges it into
    /// the `existing` kubeconfig document, returning the new document.
    pub async fn merge(&self, existing: &str, cluster: &str, role: &str) -> Result<String> {
        let namespace = derive_namespace(role);
        info!(cluster, role, namespace, "write a kubeconfig for");

        // a broken file must not cost a certificate
        let mut config = KubeConfig::parse(existing)?;

        let identity = self
            .client
            .lookup_self()
            .await
            .map_err(|e| Error::vault("error getting own identity", e))?
            .identity()?;
        info!(identity = identity.as_str(), "got your identity");

        let definition = ClusterDefinition::fetch(self.client, self.clusters_path, cluster).await?;
        definition.validate()?;
        info!(
            cluster = definition.name.as_str(),
            pki = definition.pki.as_str(),
            server = definition.server.as_str(),
            alias = definition.alias.as_str(),
            "using k8s definition"
        );

        let pki = if definition.is_alias() {
            let target =
                ClusterDefinition::fetch(self.client, self.clusters_path, &definition.alias)
                    .await?;
            target.validate()?;
            if target.is_alias() {
                return Err(Error::Validation(format!(
                    "alias [{}] must point to a cluster with a pki",
                    definition.alias
                )));
            }
            info!(
                alias = definition.alias.as_str(),
                pki = target.pki.as_str(),
                "[{}] is an alias pointing to [{}]",
                definition.name,
                target.name
            );
            target.pki
        } else {
            definition.pki.clone()
        };

        let issued = self.issue(&pki, role, &identity).await?;
        match certificate::summarize(&issued.certificate) {
            Ok(summary) => info!(
                subject = summary.subject.as_str(),
                issuer = summary.issuer.as_str(),
                expires = %summary.not_after.to_rfc3339(),
                "issued client certificate"
            ),
            Err(e) => debug!("cannot inspect issued certificate: {}", e),
        }

        let user_name = format!("{}_{}", definition.name, identity);
        config.apply(
            ClusterEntry {
                name: definition.name.clone(),
                cluster: Cluster {
                    server: definition.server.clone(),
                    certificate_authority_data: encode(&issued.issuing_ca),
                    ..Cluster::default()
                },
            },
            ContextEntry {
                name: definition.name.clone(),
                context: Context {
                    cluster: definition.name.clone(),
                    namespace: namespace.to_string(),
                    user: user_name.clone(),
                    ..Context::default()
                },
            },
            UserEntry {
                name: user_name,
                user: User {
                    client_certificate_data: encode(&issued.certificate),
                    client_key_data: encode(&issued.private_key),
                    ..User::default()
                },
            },
        );

        let out = config.to_yaml()?;
        info!(
            cluster = definition.name.as_str(),
            api = definition.server.as_str(),
            role,
            "kubeconfig entry ready"
        );
        Ok(out)
    }

    async fn issue(&self, pki: &str, role: &str, identity: &str) -> Result<IssuedCertificate> {
        let path = format!("{}/issue/{}", pki, role);
        let secret = self
            .client
            .write(
                &path,
                &json!({
                    "common_name": identity,
                    "ttl": CERT_TTL,
                }),
            )
            .await
            .and_then(|secret| secret.ok_or_else(|| VaultError::Empty(path.clone())))
            .map_err(|e| Error::vault("error creating client key for cluster", e))?;
        IssuedCertificate::from_secret(&secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::testutil::{self, CA, CERT, CLUSTERS_PATH, PRIVATE_KEY};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn stub_clusters(server: &MockServer) {
        testutil::mock_lookup_self(server, "smurf", 3600).await;
        testutil::mock_cluster(
            server,
            "jim",
            Some("jim"),
            Some("https://jim.k8s.example.com"),
            Some("k8s-pki"),
            None,
        )
        .await;
        testutil::mock_cluster(
            server,
            "lukas",
            Some("lukas"),
            Some("https://lukas.k8s.example.com"),
            None,
            Some("jim"),
        )
        .await;
        testutil::mock_cluster(
            server,
            "emma",
            Some("emma"),
            Some("https://emma.k8s.example.com"),
            Some("k8s-pki-emma"),
            None,
        )
        .await;
        testutil::mock_issue(server, "k8s-pki", "master").await;
        testutil::mock_issue(server, "k8s-pki-emma", "lokomotive").await;
    }

    #[test]
    fn namespace_strips_one_known_suffix() {
        assert_eq!(derive_namespace("hase-user"), "hase");
        assert_eq!(derive_namespace("hase-admin"), "hase");
        assert_eq!(derive_namespace("hase"), "hase");
        assert_eq!(derive_namespace("hase-admin-user"), "hase-admin");
        assert_eq!(derive_namespace("hase-viewer"), "hase-viewer");
    }

    #[tokio::test]
    async fn single_cluster_into_empty_document() {
        let server = MockServer::start().await;
        stub_clusters(&server).await;
        let client = testutil::client(&server);
        let writer = KubeconfigWriter::new(&client, CLUSTERS_PATH);

        let out = writer.merge("", "jim", "master").await.unwrap();
        let config = KubeConfig::parse(&out).unwrap();

        assert_eq!(config.api_version, "v1");
        assert_eq!(config.kind, "Config");
        assert_eq!(config.current_context, "jim");

        let cluster = config.cluster("jim").unwrap();
        assert_eq!(cluster.cluster.server, "https://jim.k8s.example.com");
        assert_eq!(cluster.cluster.certificate_authority_data, encode(CA));

        let context = config.context("jim").unwrap();
        assert_eq!(context.context.cluster, "jim");
        assert_eq!(context.context.namespace, "master");
        assert_eq!(context.context.user, "jim_smurf");

        let user = config.user("jim_smurf").unwrap();
        assert_eq!(user.user.client_certificate_data, encode(CERT));
        assert_eq!(user.user.client_key_data, encode(PRIVATE_KEY));
    }

    #[tokio::test]
    async fn issuance_request_carries_identity_and_ttl() {
        let server = MockServer::start().await;
        testutil::mock_lookup_self(&server, "smurf", 3600).await;
        testutil::mock_cluster(
            &server,
            "jim",
            Some("jim"),
            Some("https://jim.k8s.example.com"),
            Some("k8s-pki"),
            None,
        )
        .await;
        Mock::given(method("PUT"))
            .and(path("/v1/k8s-pki/issue/hase-user"))
            .and(body_json(json!({ "common_name": "smurf", "ttl": "3600" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "issuing_ca": CA,
                    "certificate": CERT,
                    "private_key": PRIVATE_KEY,
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = testutil::client(&server);
        let out = KubeconfigWriter::new(&client, CLUSTERS_PATH)
            .merge("", "jim", "hase-user")
            .await
            .unwrap();
        let config = KubeConfig::parse(&out).unwrap();
        assert_eq!(config.context("jim").unwrap().context.namespace, "hase");
    }

    #[tokio::test]
    async fn alias_uses_the_target_pki_but_its_own_name_and_server() {
        let server = MockServer::start().await;
        stub_clusters(&server).await;
        let client = testutil::client(&server);

        let out = KubeconfigWriter::new(&client, CLUSTERS_PATH)
            .merge("", "lukas", "master")
            .await
            .unwrap();
        let config = KubeConfig::parse(&out).unwrap();

        assert_eq!(config.clusters.len(), 1);
        assert_eq!(
            config.cluster("lukas").unwrap().cluster.server,
            "https://lukas.k8s.example.com"
        );
        assert!(config.user("lukas_smurf").is_some());
        assert_eq!(config.current_context, "lukas");
    }

    #[tokio::test]
    async fn clusters_accumulate_across_runs() {
        let server = MockServer::start().await;
        stub_clusters(&server).await;
        let client = testutil::client(&server);
        let writer = KubeconfigWriter::new(&client, CLUSTERS_PATH);

        let mut doc = String::new();
        for (cluster, role) in [("lukas", "master"), ("emma", "lokomotive"), ("jim", "master")] {
            doc = writer.merge(&doc, cluster, role).await.unwrap();
        }
        let config = KubeConfig::parse(&doc).unwrap();

        assert_eq!(config.clusters.len(), 3);
        assert_eq!(config.contexts.len(), 3);
        assert_eq!(config.users.len(), 3);
        assert_eq!(config.current_context, "jim");
        for user in ["lukas_smurf", "emma_smurf", "jim_smurf"] {
            assert!(config.user(user).is_some(), "missing user {}", user);
        }
        for (name, namespace) in [("lukas", "master"), ("emma", "lokomotive"), ("jim", "master")] {
            let context = &config.context(name).unwrap().context;
            assert_eq!(context.namespace, namespace, "namespace of {}", name);
            assert_eq!(context.cluster, name);
            assert_eq!(context.user, format!("{}_smurf", name));
        }
    }

    #[tokio::test]
    async fn merging_twice_keeps_names_unique() {
        let server = MockServer::start().await;
        stub_clusters(&server).await;
        let client = testutil::client(&server);
        let writer = KubeconfigWriter::new(&client, CLUSTERS_PATH);

        let first = writer.merge("", "jim", "master").await.unwrap();
        let second = writer.merge(&first, "jim", "master").await.unwrap();
        let config = KubeConfig::parse(&second).unwrap();

        assert_eq!(config.clusters.len(), 1);
        assert_eq!(config.contexts.len(), 1);
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.users[0].name, "jim_smurf");
    }

    #[tokio::test]
    async fn malformed_document_fails_before_issuance() {
        let server = MockServer::start().await;
        testutil::mock_lookup_self(&server, "smurf", 3600).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = testutil::client(&server);

        let err = KubeconfigWriter::new(&client, CLUSTERS_PATH)
            .merge("clusters: [ {", "jim", "master")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Yaml { .. }));
    }

    #[tokio::test]
    async fn empty_identity_is_rejected() {
        let server = MockServer::start().await;
        testutil::mock_lookup_self(&server, "", 3600).await;
        let client = testutil::client(&server);

        let err = KubeconfigWriter::new(&client, CLUSTERS_PATH)
            .merge("", "jim", "master")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "identity must be not empty/nil");
    }

    #[tokio::test]
    async fn invalid_cluster_definition_is_reported() {
        let server = MockServer::start().await;
        testutil::mock_lookup_self(&server, "smurf", 3600).await;
        testutil::mock_cluster(
            &server,
            "broken",
            Some("broken"),
            Some("https://broken.k8s.example.com"),
            Some("k8s-pki"),
            Some("jim"),
        )
        .await;
        let client = testutil::client(&server);

        let err = KubeconfigWriter::new(&client, CLUSTERS_PATH)
            .merge("", "broken", "master")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "pki must be empty");
    }
}
