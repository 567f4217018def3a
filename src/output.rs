//! Writing issued artifacts to the output directory.
//!
//! All artifacts of one issuance are written as a group: each is staged in a
//! temporary file beside its destination, then renamed into place. If any
//! rename fails, the files already renamed by this call are removed again.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{CertMintError, Result};

pub const KEY_SUFFIX: &str = "-key.pem";
pub const CERT_SUFFIX: &str = "-cert.pem";
pub const CSR_SUFFIX: &str = "-csr.pem";
pub const P12_SUFFIX: &str = ".p12";

/// `<out>/<name><suffix>`
pub fn artifact_path(out: &Path, name: &str, suffix: &str) -> PathBuf {
    out.join(format!("{name}{suffix}"))
}

/// One file to be written.
#[derive(Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: Vec<u8>,
    /// Secret artifacts are readable by the owner only.
    pub secret: bool,
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("path", &self.path)
            .field("len", &self.contents.len())
            .field("secret", &self.secret)
            .finish()
    }
}

impl Artifact {
    pub fn public(path: PathBuf, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            contents: contents.into(),
            secret: false,
        }
    }

    pub fn secret(path: PathBuf, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            contents: contents.into(),
            secret: true,
        }
    }
}

/// Fails with [`CertMintError::OutputExists`] on the first path already present.
pub fn ensure_absent<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    for path in paths {
        if path.exists() {
            return Err(CertMintError::OutputExists(path.to_path_buf()));
        }
    }
    Ok(())
}

/// Writes every artifact or none of them.
///
/// Without `force`, an existing destination fails the call with
/// [`CertMintError::OutputExists`] and nothing is written.
pub fn write_artifacts(artifacts: &[Artifact], force: bool) -> Result<Vec<PathBuf>> {
    if !force {
        ensure_absent(artifacts.iter().map(|a| a.path.as_path()))?;
    }

    let staged = artifacts
        .iter()
        .map(stage)
        .collect::<Result<Vec<NamedTempFile>>>()?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(artifacts.len());
    for (artifact, temp) in artifacts.iter().zip(staged) {
        let path = &artifact.path;
        let existed = path.exists();
        let persisted = if force {
            temp.persist(path)
        } else {
            temp.persist_noclobber(path)
        };

        if let Err(e) = persisted {
            remove_written(&written);
            let err = if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                CertMintError::OutputExists(path.clone())
            } else {
                CertMintError::io(path.clone(), e.error)
            };
            return Err(err);
        }

        if existed {
            tracing::warn!(path = %path.display(), "overwrote existing file");
        }
        tracing::info!(path = %path.display(), secret = artifact.secret, "wrote artifact");
        written.push(path.clone());
    }

    Ok(written)
}

fn stage(artifact: &Artifact) -> Result<NamedTempFile> {
    let dir = artifact
        .path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".certmint-")
        .tempfile_in(dir)
        .map_err(|e| CertMintError::io(dir, e))?;

    temp.write_all(&artifact.contents)
        .map_err(|e| CertMintError::io(temp.path(), e))?;

    // Temporary files start out as 0600.
    #[cfg(unix)]
    if !artifact.secret {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| CertMintError::io(temp.path(), e))?;
    }

    temp.as_file()
        .sync_all()
        .map_err(|e| CertMintError::io(temp.path(), e))?;
    Ok(temp)
}

fn remove_written(written: &[PathBuf]) {
    for path in written {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "unable to remove partial output");
        }
    }
}
