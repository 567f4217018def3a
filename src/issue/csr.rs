use std::path::PathBuf;

use const_oid::ObjectIdentifier;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
    ToAndFromX509Extension,
};
use crate::cert::params::CertificateTemplate;
use crate::config::CsrConfig;
use crate::csr::CertificateRequest;
use crate::error::Result;
use crate::issuer::Issuer;
use crate::output::{self, Artifact, CERT_SUFFIX, CSR_SUFFIX, KEY_SUFFIX};

use super::{Subject, load_signing_ca, require_name, validity};

/// Requested extensions the signing CA always decides itself.
const CA_CONTROLLED: [ObjectIdentifier; 5] = [
    BasicConstraints::OID,
    KeyUsage::OID,
    ExtendedKeyUsage::OID,
    SubjectKeyIdentifier::OID,
    AuthorityKeyIdentifier::OID,
];

/// Paths written by the CSR flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFiles {
    pub request: PathBuf,
    pub key: PathBuf,
    /// Present when signing material was supplied.
    pub certificate: Option<PathBuf>,
}

/// Generates a key and a PKCS#10 request for it.
///
/// When `config` carries signing material, the request is verified and
/// immediately countersigned into a leaf certificate valid for
/// `config.duration`. Requested SAN, policy and custom extensions are copied
/// into that certificate.
pub fn issue_csr(config: &CsrConfig) -> Result<RequestFiles> {
    require_name(&config.name)?;
    let validity = validity(config.duration)?;
    let signing = config.signing_material()?;
    let subject = Subject::build(
        &config.subject,
        &config.alt_names,
        &config.policies,
        &config.extensions,
    )?;

    let request_path = output::artifact_path(&config.out, &config.name, CSR_SUFFIX);
    let key_path = output::artifact_path(&config.out, &config.name, KEY_SUFFIX);
    let cert_path = signing
        .is_some()
        .then(|| output::artifact_path(&config.out, &config.name, CERT_SUFFIX));

    if !config.force {
        output::ensure_absent(
            [&request_path, &key_path]
                .into_iter()
                .chain(cert_path.as_ref())
                .map(PathBuf::as_path),
        )?;
    }

    let parent = load_signing_ca(signing.as_ref())?;
    let key = config.algorithm.generate()?;
    let request = CertificateRequest::new(subject.name, &key, &subject.extensions)?;

    let mut artifacts = vec![
        Artifact::public(request_path.clone(), request.to_pem()?),
        Artifact::secret(key_path.clone(), key.to_pkcs8_pem(config.password.as_deref())?),
    ];

    if let (Some(parent), Some(cert_path)) = (&parent, &cert_path) {
        request.verify()?;
        // Same extensions the request carries, taken before encoding.
        let extensions: Vec<_> = subject
            .extensions
            .iter()
            .filter(|ext| !CA_CONTROLLED.contains(&ext.oid))
            .cloned()
            .collect();
        let template = CertificateTemplate::builder()
            .subject(request.subject().clone())
            .subject_public_key(request.public_key_info().clone())
            .validity(validity)
            .extensions(extensions)
            .build();
        let cert = parent.issue(&template)?;
        artifacts.push(Artifact::public(cert_path.clone(), cert.to_pem()?));
    }

    output::write_artifacts(&artifacts, config.force)?;

    tracing::info!(
        name = %config.name,
        signed = parent.is_some(),
        algorithm = %config.algorithm,
        request = %request_path.display(),
        "issued certificate request"
    );

    Ok(RequestFiles {
        request: request_path,
        key: key_path,
        certificate: cert_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;
    use tempfile::TempDir;

    #[test]
    fn test_unsigned_request() {
        let dir = TempDir::new().unwrap();
        let config = CsrConfig::builder()
            .name("req")
            .subject(DistinguishedName::builder().common_name("req.test").build())
            .out(dir.path())
            .build();
        let files = issue_csr(&config).unwrap();
        assert!(files.certificate.is_none());
        assert_eq!(files.request, dir.path().join("req-csr.pem"));

        let request =
            CertificateRequest::from_pem(&std::fs::read_to_string(&files.request).unwrap())
                .unwrap();
        request.verify().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
