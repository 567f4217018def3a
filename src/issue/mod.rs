//! Issuance flows: CA and leaf certificates, and certificate signing requests.
//!
//! Every flow validates all of its inputs before a key is generated, builds
//! every artifact in memory, and only then writes them as one group.

mod certificate;
mod csr;

pub use certificate::{CertifiedFiles, issue_ca, issue_certificate, issue_leaf};
pub use csr::{RequestFiles, issue_csr};

use time::Duration;
use x509_cert::name::Name;

use crate::cert::CertificateWithPrivateKey;
use crate::cert::custom::parse_extensions;
use crate::cert::extensions::CertificatePolicies;
use crate::cert::params::{AltNames, DistinguishedName, ExtensionParam, Validity};
use crate::config::SigningMaterial;
use crate::error::{CertMintError, Result};

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CertMintError::MissingName);
    }
    Ok(())
}

/// Validity window of `duration` starting now; the duration must be positive.
fn validity(duration: Duration) -> Result<Validity> {
    if !duration.is_positive() {
        return Err(CertMintError::InvalidDuration(duration));
    }
    Validity::from_now(duration)
}

/// Subject and requested extensions shared by every flow.
struct Subject {
    name: Name,
    /// SAN, certificate policies, then custom extensions in input order.
    extensions: Vec<ExtensionParam>,
}

impl Subject {
    fn build(
        dn: &DistinguishedName,
        alt_names: &AltNames,
        policies: &[String],
        extensions: &[String],
    ) -> Result<Self> {
        let san = alt_names.parse()?;
        let custom = parse_extensions(extensions)?;
        let policies = CertificatePolicies::parse(policies)?;
        let name = dn.as_x509_name()?;

        let mut params = Vec::new();
        if !san.is_empty() {
            // RFC 5280 §4.2.1.6: critical when the subject is empty.
            params.push(ExtensionParam::from_extension(san, dn.is_empty())?);
        }
        if !policies.policies.is_empty() {
            params.push(ExtensionParam::from_extension(policies, false)?);
        }
        params.extend(custom.iter().flatten().map(|ext| ext.to_param()));

        Ok(Self {
            name,
            extensions: params,
        })
    }
}

fn load_signing_ca(
    material: Option<&SigningMaterial>,
) -> Result<Option<CertificateWithPrivateKey>> {
    material
        .map(|m| CertificateWithPrivateKey::load(&m.cert, &m.key, m.key_password.as_deref()))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::{SubjectAltName, ToAndFromX509Extension};

    #[test]
    fn test_name_and_duration() {
        assert!(matches!(require_name(""), Err(CertMintError::MissingName)));
        assert!(matches!(require_name("  "), Err(CertMintError::MissingName)));
        require_name("ca").unwrap();

        assert!(validity(Duration::ZERO).is_err());
        assert!(validity(Duration::seconds(-1)).is_err());
        let window = validity(Duration::seconds(1)).unwrap();
        assert_eq!(window.not_after - window.not_before, Duration::seconds(1));

        let century = validity(Duration::days(365 * 100)).unwrap();
        assert!(century.not_after.year() > 2100);
        assert!(matches!(
            validity(Duration::days(365 * 10_000)),
            Err(CertMintError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_subject_extension_order() {
        let alt_names = AltNames::builder()
            .dns(vec!["demo.com".to_string()])
            .build();
        let subject = Subject::build(
            &DistinguishedName::builder().common_name("demo").build(),
            &alt_names,
            &["1.3.6.1.4.1.44947.1.1.1".to_string()],
            &["1.2.3:coucou bro".to_string(), "1.2.2:coucou2".to_string()],
        )
        .unwrap();

        let oids: Vec<String> = subject.extensions.iter().map(|e| e.oid.to_string()).collect();
        assert_eq!(oids, vec!["2.5.29.17", "2.5.29.32", "1.2.3", "1.2.2"]);
        assert!(!subject.extensions[0].critical);
    }

    #[test]
    fn test_san_is_critical_for_empty_subject() {
        let alt_names = AltNames::builder()
            .emails(vec!["ops@demo.com".to_string()])
            .build();
        let subject =
            Subject::build(&DistinguishedName::default(), &alt_names, &[], &[]).unwrap();
        assert!(subject.name.0.is_empty());
        assert_eq!(subject.extensions[0].oid, SubjectAltName::OID);
        assert!(subject.extensions[0].critical);
    }

    #[test]
    fn test_invalid_inputs_are_reported_in_order() {
        let alt_names = AltNames::builder().ips(vec!["nope".to_string()]).build();
        let err = Subject::build(
            &DistinguishedName::default(),
            &alt_names,
            &["bad policy".to_string()],
            &["coucou".to_string()],
        )
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, CertMintError::InvalidIpAddress(_)));

        let err = Subject::build(
            &DistinguishedName::default(),
            &AltNames::default(),
            &["bad policy".to_string()],
            &["coucou".to_string()],
        )
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, CertMintError::InvalidExtensionFormat(_)));
    }
}
