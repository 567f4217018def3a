//! Issuance configuration.
//!
//! Each flow takes one of these structures instead of a positional argument
//! list. Fields left unset keep their documented defaults.

use std::path::{Path, PathBuf};

use bon::Builder;
use time::Duration;

use crate::cert::params::{AltNames, DistinguishedName};
use crate::error::{CertMintError, Result};
use crate::key::KeyAlgorithm;

/// Inputs for the CA and leaf certificate flows.
///
/// # Fields
/// * `name` - Base file name of every artifact, must not be empty.
/// * `subject` - Subject distinguished name, may be entirely empty.
/// * `alt_names` - DNS, IP and email subject alternative names.
/// * `password` - Encrypts the private key PEM when not empty.
/// * `is_ca` - Issue a CA certificate instead of a leaf.
/// * `auth_server` / `auth_client` / `auth_email` - Extended key usages to assert.
/// * `p12` / `p12_password` - Also write a PKCS#12 bundle protected by its own password.
/// * `out` - Existing output directory.
/// * `force` - Overwrite artifacts that already exist.
/// * `algorithm` - Key algorithm of the new key.
/// * `signing_cert` / `signing_key` / `signing_key_password` - Parent CA, all or none.
/// * `duration` - Validity length counted from issuance.
/// * `policies` - Certificate policy OIDs.
/// * `extensions` - Custom extensions as `oid:value`.
#[derive(Debug, Clone, Builder)]
pub struct CertificateConfig {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub subject: DistinguishedName,
    #[builder(default)]
    pub alt_names: AltNames,
    #[builder(into)]
    pub password: Option<String>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub auth_server: bool,
    #[builder(default)]
    pub auth_client: bool,
    #[builder(default)]
    pub auth_email: bool,
    #[builder(default)]
    pub p12: bool,
    #[builder(into)]
    pub p12_password: Option<String>,
    #[builder(into)]
    pub out: PathBuf,
    #[builder(default)]
    pub force: bool,
    #[builder(default)]
    pub algorithm: KeyAlgorithm,
    #[builder(into)]
    pub signing_cert: Option<PathBuf>,
    #[builder(into)]
    pub signing_key: Option<PathBuf>,
    #[builder(into)]
    pub signing_key_password: Option<String>,
    #[builder(default = Duration::days(365))]
    pub duration: Duration,
    #[builder(default)]
    pub policies: Vec<String>,
    #[builder(default)]
    pub extensions: Vec<String>,
}

impl CertificateConfig {
    pub fn signing_material(&self) -> Result<Option<SigningMaterial>> {
        SigningMaterial::from_parts(
            self.signing_cert.as_deref(),
            self.signing_key.as_deref(),
            self.signing_key_password.as_deref(),
        )
    }
}

/// Inputs for the CSR flow.
///
/// Mirrors [`CertificateConfig`] without the CA and bundle switches. When
/// signing material is supplied, a certificate valid for `duration` is issued
/// from the request in the same call.
#[derive(Debug, Clone, Builder)]
pub struct CsrConfig {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub subject: DistinguishedName,
    #[builder(default)]
    pub alt_names: AltNames,
    /// Encrypts the request key PEM when not empty.
    #[builder(into)]
    pub password: Option<String>,
    #[builder(into)]
    pub out: PathBuf,
    #[builder(default)]
    pub force: bool,
    #[builder(default)]
    pub algorithm: KeyAlgorithm,
    #[builder(into)]
    pub signing_cert: Option<PathBuf>,
    #[builder(into)]
    pub signing_key: Option<PathBuf>,
    #[builder(into)]
    pub signing_key_password: Option<String>,
    #[builder(default = Duration::hours(24))]
    pub duration: Duration,
    #[builder(default)]
    pub policies: Vec<String>,
    #[builder(default)]
    pub extensions: Vec<String>,
}

impl CsrConfig {
    pub fn signing_material(&self) -> Result<Option<SigningMaterial>> {
        SigningMaterial::from_parts(
            self.signing_cert.as_deref(),
            self.signing_key.as_deref(),
            self.signing_key_password.as_deref(),
        )
    }
}

/// Paths to a parent CA certificate and its private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningMaterial {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub key_password: Option<String>,
}

impl SigningMaterial {
    /// Validates the signing group as a whole.
    ///
    /// Returns `None` when nothing was supplied. Certificate and key must come
    /// together, and a password alone is rejected. An empty password counts
    /// as absent.
    pub fn from_parts(
        cert: Option<&Path>,
        key: Option<&Path>,
        key_password: Option<&str>,
    ) -> Result<Option<Self>> {
        let cert = cert.filter(|p| !p.as_os_str().is_empty());
        let key = key.filter(|p| !p.as_os_str().is_empty());
        let key_password = key_password.filter(|p| !p.is_empty());

        match (cert, key) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert: cert.to_path_buf(),
                key: key.to_path_buf(),
                key_password: key_password.map(str::to_owned),
            })),
            (None, None) if key_password.is_some() => Err(CertMintError::IncompleteSigningChain(
                "a signing key password was given without a signing certificate and key"
                    .to_string(),
            )),
            (None, None) => Ok(None),
            (Some(_), None) => Err(CertMintError::IncompleteSigningChain(
                "a signing certificate was given without its private key".to_string(),
            )),
            (None, Some(_)) => Err(CertMintError::IncompleteSigningChain(
                "a signing key was given without its certificate".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_signing_material_all_or_none() {
        assert_eq!(SigningMaterial::from_parts(None, None, None).unwrap(), None);
        assert_eq!(
            SigningMaterial::from_parts(None, None, Some("")).unwrap(),
            None
        );

        let material = SigningMaterial::from_parts(
            Some(Path::new("ca-cert.pem")),
            Some(Path::new("ca-key.pem")),
            Some("secret"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(material.key_password.as_deref(), Some("secret"));

        for (cert, key, password) in [
            (Some(Path::new("ca-cert.pem")), None, None),
            (None, Some(Path::new("ca-key.pem")), Some("secret")),
            (None, None, Some("secret")),
            (Some(Path::new("")), Some(Path::new("ca-key.pem")), None),
        ] {
            let err = SigningMaterial::from_parts(cert, key, password).unwrap_err();
            assert!(matches!(err, CertMintError::IncompleteSigningChain(_)));
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn test_defaults() {
        let config = CertificateConfig::builder()
            .name("ca")
            .out("/tmp")
            .build();
        assert_eq!(config.duration, Duration::days(365));
        assert_eq!(config.algorithm, KeyAlgorithm::EcdsaP256);
        assert!(config.signing_material().unwrap().is_none());

        let csr = CsrConfig::builder().name("req").out("/tmp").build();
        assert_eq!(csr.duration, Duration::hours(24));
    }
}
