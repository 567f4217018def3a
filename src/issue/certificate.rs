use std::path::PathBuf;

use crate::bundle;
use crate::cert::Certificate;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::params::CertificateTemplate;
use crate::config::CertificateConfig;
use crate::error::Result;
use crate::issuer::Issuer;
use crate::output::{self, Artifact, CERT_SUFFIX, KEY_SUFFIX, P12_SUFFIX};

use super::{Subject, load_signing_ca, require_name, validity};

/// Paths written by a certificate issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertifiedFiles {
    pub certificate: PathBuf,
    pub key: PathBuf,
    /// Present when a PKCS#12 bundle was requested.
    pub bundle: Option<PathBuf>,
}

/// Issues a CA or leaf certificate depending on `config.is_ca`.
pub fn issue_certificate(config: &CertificateConfig) -> Result<CertifiedFiles> {
    issue(config, config.is_ca)
}

/// Issues a CA certificate, self-signed unless signing material is configured.
///
/// `config.is_ca` is ignored.
pub fn issue_ca(config: &CertificateConfig) -> Result<CertifiedFiles> {
    issue(config, true)
}

/// Issues an end-entity certificate.
///
/// Without signing material the certificate is self-signed, which is only
/// meant for quick local testing. `config.is_ca` is ignored.
pub fn issue_leaf(config: &CertificateConfig) -> Result<CertifiedFiles> {
    issue(config, false)
}

fn usages(config: &CertificateConfig) -> Vec<ExtendedKeyUsageOption> {
    [
        (config.auth_server, ExtendedKeyUsageOption::ServerAuth),
        (config.auth_client, ExtendedKeyUsageOption::ClientAuth),
        (config.auth_email, ExtendedKeyUsageOption::EmailProtection),
    ]
    .into_iter()
    .filter_map(|(enabled, usage)| enabled.then_some(usage))
    .collect()
}

fn issue(config: &CertificateConfig, is_ca: bool) -> Result<CertifiedFiles> {
    require_name(&config.name)?;
    let validity = validity(config.duration)?;
    let signing = config.signing_material()?;
    let subject = Subject::build(
        &config.subject,
        &config.alt_names,
        &config.policies,
        &config.extensions,
    )?;

    let cert_path = output::artifact_path(&config.out, &config.name, CERT_SUFFIX);
    let key_path = output::artifact_path(&config.out, &config.name, KEY_SUFFIX);
    let bundle_path = config
        .p12
        .then(|| output::artifact_path(&config.out, &config.name, P12_SUFFIX));

    if !config.force {
        output::ensure_absent(
            [&cert_path, &key_path]
                .into_iter()
                .chain(bundle_path.as_ref())
                .map(PathBuf::as_path),
        )?;
    }

    let parent = load_signing_ca(signing.as_ref())?;
    let key = config.algorithm.generate()?;

    let template = CertificateTemplate::builder()
        .subject(subject.name)
        .subject_public_key(key.as_spki()?)
        .validity(validity)
        .usages(usages(config))
        .is_ca(is_ca)
        .extensions(subject.extensions)
        .build();

    let cert = match &parent {
        Some(parent) => parent.issue(&template)?,
        None => Certificate::new_self_signed(&template, &key)?,
    };

    let mut artifacts = vec![
        Artifact::public(cert_path.clone(), cert.to_pem()?),
        Artifact::secret(key_path.clone(), key.to_pkcs8_pem(config.password.as_deref())?),
    ];
    if let Some(bundle_path) = &bundle_path {
        let der = bundle::to_pkcs12(
            &cert,
            &key,
            parent.as_ref().map(|p| &p.cert),
            config.p12_password.as_deref().unwrap_or_default(),
            &config.name,
        )?;
        artifacts.push(Artifact::secret(bundle_path.clone(), der));
    }

    output::write_artifacts(&artifacts, config.force)?;

    tracing::info!(
        name = %config.name,
        is_ca,
        chained = parent.is_some(),
        algorithm = %config.algorithm,
        certificate = %cert_path.display(),
        "issued certificate"
    );

    Ok(CertifiedFiles {
        certificate: cert_path,
        key: key_path,
        bundle: bundle_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;
    use crate::error::CertMintError;
    use crate::key::KeyPair;
    use tempfile::TempDir;

    fn config(dir: &TempDir, name: &str) -> CertificateConfig {
        CertificateConfig::builder()
            .name(name)
            .subject(DistinguishedName::builder().common_name("unit").build())
            .out(dir.path())
            .auth_server(true)
            .auth_email(true)
            .build()
    }

    #[test]
    fn test_usages_follow_flags() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            usages(&config(&dir, "leaf")),
            vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::EmailProtection
            ]
        );
    }

    #[test]
    fn test_issue_ca_writes_key_and_certificate() {
        let dir = TempDir::new().unwrap();
        let files = issue_ca(&config(&dir, "root")).unwrap();
        assert_eq!(files.certificate, dir.path().join("root-cert.pem"));
        assert_eq!(files.key, dir.path().join("root-key.pem"));
        assert!(files.bundle.is_none());

        let cert =
            Certificate::from_pem(&std::fs::read_to_string(&files.certificate).unwrap()).unwrap();
        assert!(cert.is_ca());
        let key = KeyPair::from_pem(&std::fs::read_to_string(&files.key).unwrap(), None).unwrap();
        assert!(cert.public_key().unwrap().matches(&key.public_key()).unwrap());
    }

    #[test]
    fn test_invalid_input_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir, "bad");
        cfg.extensions = vec!["coucou".to_string()];
        let err = issue_leaf(&cfg).unwrap_err();
        assert!(matches!(err, CertMintError::InvalidExtensionFormat(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
