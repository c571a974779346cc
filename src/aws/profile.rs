// src/aws/profile.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};
use ini::Ini;

use super::sts::StsCredentials;
use crate::error::{Error, Result};

/// `~/.aws/credentials`, following a symlink when there is one.
pub fn credentials_path(home: &Path) -> Result<PathBuf> {
    let path = home.join(".aws").join("credentials");
    match fs::canonicalize(&path) {
        Ok(resolved) => Ok(resolved),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path),
        Err(e) => Err(Error::io("unable to resolve symlink", path, e)),
    }
}

fn load(path: &Path) -> Result<Ini> {
    if !path.exists() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io("unable to locate creds file", dir, e))?;
        }
        return Ok(Ini::new());
    }
    Ini::load_from_file(path).map_err(|e| match e {
        ini::Error::Io(e) => Error::io("unable to read creds file", path, e),
        ini::Error::Parse(e) => Error::Config(format!(
            "unable to parse creds file [{}]: {}",
            path.display(),
            e
        )),
    })
}

/// Writes `creds` into section `profile`, replacing that section and
/// keeping every other one. The session is assumed to last one hour from
/// `now`.
pub fn write_profile(
    path: &Path,
    profile: &str,
    creds: &StsCredentials,
    region: &str,
    now: DateTime<Local>,
) -> Result<()> {
    let mut conf = load(path)?;
    let expires = (now + Duration::hours(1)).to_rfc3339();

    conf.delete(Some(profile));
    conf.with_section(Some(profile))
        .set("aws_access_key_id", creds.access_key.as_str())
        .set("aws_secret_access_key", creds.secret_key.as_str())
        .set("aws_session_token", creds.security_token.as_str())
        .set("aws_security_token", creds.security_token.as_str())
        .set("x_security_token_expires", expires)
        .set("region", region);

    conf.write_to_file(path)
        .map_err(|e| Error::io("cannot write creds file", path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::io("cannot restrict creds file", path, e))?;
    }
    Ok(())
}
