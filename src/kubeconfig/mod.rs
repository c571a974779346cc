// src/kubeconfig/mod.rs
mod certificate;
mod cluster;
mod merge;
mod model;

use merge::KubeconfigWriter;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{Environment, PalConfig};
use crate::error::{Error, Result};
use crate::vault::VaultClient;

/// `VAULTPAL_KUBECONFIG_FILE`, then the configured file, then
/// `~/.vaultpal/kube/config`.
pub fn kubeconfig_path(env: &Environment, config: &PalConfig) -> Result<PathBuf> {
    if let Some(path) = &env.kubeconfig_file {
        return Ok(path.clone());
    }
    if let Some(path) = config.kubeconfig_file() {
        return Ok(path);
    }
    Ok(env.home()?.join(".vaultpal").join("kube").join("config"))
}

fn create_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o740);
    }
    builder.create(dir)
}

fn restrict(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Creates the kubeconfig file, empty, if it does not exist yet.
pub fn ensure_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent).map_err(|e| Error::io("cannot create dir", parent, e))?;
    }

    info!("create empty kubeconfig [{}]", path.display());
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
        .open(path)
        .map(|_| ())
        .map_err(|e| Error::io("cannot write kubeconfig to", path, e))
}

/// Merges a fresh certificate for `cluster`/`role` into the kubeconfig file
/// and returns its path.
pub async fn write_kubeconfig(
    client: &VaultClient,
    env: &Environment,
    config: &PalConfig,
    cluster: &str,
    role: &str,
) -> Result<PathBuf> {
    let path = kubeconfig_path(env, config)?;
    ensure_file(&path)?;

    let existing = fs::read_to_string(&path)
        .map_err(|e| Error::io("unable to read existing kube config", &path, e))?;

    let merged = KubeconfigWriter::new(client, &config.clusters_path)
        .merge(&existing, cluster, role)
        .await?;

    fs::write(&path, merged).map_err(|e| Error::io("cannot write kubeconfig to", &path, e))?;
    restrict(&path).map_err(|e| Error::io("cannot restrict kubeconfig", &path, e))?;

    info!("Enable kubeconfig with: KUBECONFIG={}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::model::KubeConfig;
    use super::*;
    use crate::vault::testutil;
    use wiremock::MockServer;

    #[test]
    fn path_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment {
            home: Some(dir.path().to_path_buf()),
            ..Environment::default()
        };
        let mut config = PalConfig::default();

        assert_eq!(
            kubeconfig_path(&env, &config).unwrap(),
            dir.path().join(".vaultpal/kube/config")
        );

        config.kubeconfig_file = Some("/etc/kube/from-config".to_string());
        assert_eq!(
            kubeconfig_path(&env, &config).unwrap(),
            PathBuf::from("/etc/kube/from-config")
        );

        env.kubeconfig_file = Some(PathBuf::from("/etc/kube/from-env"));
        assert_eq!(
            kubeconfig_path(&env, &config).unwrap(),
            PathBuf::from("/etc/kube/from-env")
        );
    }

    #[tokio::test]
    async fn writes_the_merged_file() {
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
        testutil::mock_issue(&server, "k8s-pki", "master").await;

        let dir = tempfile::tempdir().unwrap();
        let env = Environment {
            home: Some(dir.path().to_path_buf()),
            ..Environment::default()
        };
        let client = testutil::client(&server);

        let path = write_kubeconfig(&client, &env, &PalConfig::default(), "jim", "master")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join(".vaultpal/kube/config"));

        let config = KubeConfig::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.current_context, "jim");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn failed_merge_leaves_the_file_alone() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "clusters: [ {").unwrap();
        let env = Environment {
            kubeconfig_file: Some(path.clone()),
            ..Environment::default()
        };
        let client = testutil::client(&server);

        assert!(
            write_kubeconfig(&client, &env, &PalConfig::default(), "jim", "master")
                .await
                .is_err()
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "clusters: [ {");
    }
}
