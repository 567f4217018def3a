use der::Encode;
use der::flagset::FlagSet;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::extensions::AuthorityKeyIdentifier;
use crate::cert::extensions::BasicConstraints;
use crate::cert::extensions::ExtendedKeyUsage;
use crate::cert::extensions::KeyUsage;
use crate::cert::extensions::KeyUsages;
use crate::cert::extensions::SubjectKeyIdentifier;
use crate::cert::params::{CertificateTemplate, ExtensionParam};
use crate::error::{CertMintError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the encoded name placed in the `issuer` field of issued certificates.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate from the provided template.
    ///
    /// The issuer adds basic constraints and key usage (both critical), extended
    /// key usage when requested, and subject/authority key identifiers, followed
    /// by the template's own extensions in order.
    ///
    /// # Arguments
    /// * `template` - Subject, key, validity and extensions of the certificate to be issued.
    ///
    /// # Returns
    /// A `Certificate` object representing the issued certificate.
    fn issue(&self, template: &CertificateTemplate) -> Result<Certificate> {
        let signing_key = self.signing_key();
        let signature_algo = signing_key.signature_algorithm();

        let basic_constraints = BasicConstraints {
            is_ca: template.is_ca,
            max_path_length: None,
        };

        let key_usage_flags: FlagSet<KeyUsages> = if template.is_ca {
            KeyUsages::KeyCertSign | KeyUsages::CRLSign
        } else {
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
        };

        let subject_key_id = SubjectKeyIdentifier {
            key_identifier: PublicKey::from_x509spki(&template.subject_public_key)?
                .key_identifier()?,
        };
        let authority_key_id = AuthorityKeyIdentifier {
            key_identifier: signing_key.public_key().key_identifier()?,
        };

        let mut extensions: Vec<ExtensionParam> = vec![
            ExtensionParam::from_extension(basic_constraints, true)?,
            ExtensionParam::from_extension(KeyUsage(key_usage_flags), true)?,
        ];

        if !template.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: template.usages.clone(),
            };
            extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
        }

        extensions.push(ExtensionParam::from_extension(subject_key_id, false)?);
        extensions.push(ExtensionParam::from_extension(authority_key_id, false)?);
        extensions.extend(template.extensions.iter().cloned());

        // RFC 5280 §4.2: an extension appears at most once.
        for (i, ext) in extensions.iter().enumerate() {
            if extensions[..i].iter().any(|earlier| earlier.oid == ext.oid) {
                return Err(CertMintError::InvalidInput(format!(
                    "extension {} appears more than once",
                    ext.oid
                )));
            }
        }

        let tbs_cert = TbsCertificate {
            serial_number: template.serial_number.clone(),
            signature_algorithm: signature_algo,
            issuer: self.issuer_name(),
            validity: template.validity.clone(),
            subject: template.subject.clone(),
            subject_public_key: template.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = signing_key.sign_with(signature_algo, &tbs_cert_inner.to_der()?)?;

        tracing::debug!(
            issuer = %tbs_cert_inner.issuer,
            subject = %tbs_cert_inner.subject,
            is_ca = template.is_ca,
            algorithm = %signature_algo,
            "signed certificate"
        );

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: der::asn1::BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::CertificateWithPrivateKey;
    use crate::cert::extensions::{ExtendedKeyUsageOption, SubjectAltName, ToAndFromX509Extension};
    use crate::cert::params::{DistinguishedName, Validity};

    fn template(key: &KeyPair, cn: &str, is_ca: bool) -> CertificateTemplate {
        CertificateTemplate::builder()
            .subject(
                DistinguishedName::builder()
                    .common_name(cn)
                    .build()
                    .as_x509_name()
                    .unwrap(),
            )
            .subject_public_key(key.as_spki().unwrap())
            .validity(Validity::from_now(time::Duration::days(30)).unwrap())
            .is_ca(is_ca)
            .build()
    }

    #[test]
    fn test_chain_issuance() {
        let ca_key = KeyPair::generate_ecdsa_p384();
        let ca_cert =
            Certificate::new_self_signed(&template(&ca_key, "Root", true), &ca_key).unwrap();
        let ca = CertificateWithPrivateKey {
            cert: ca_cert,
            key: ca_key,
        };

        let leaf_key = KeyPair::generate_ecdsa_p256();
        let mut leaf_template = template(&leaf_key, "leaf.test", false);
        leaf_template.usages = vec![ExtendedKeyUsageOption::ServerAuth];
        let leaf = ca.issue(&leaf_template).unwrap();

        assert_eq!(leaf.issuer(), ca.cert.subject());
        leaf.verify_signed_by(&ca.key.public_key()).unwrap();
        // Signed with the issuer's algorithm, not the subject's.
        assert_eq!(
            leaf.signature_algorithm().unwrap(),
            crate::cert::SignatureAlgorithm::Sha384WithECDSA
        );

        let ku = leaf.extension::<KeyUsage>().unwrap().unwrap();
        assert_eq!(ku.0, KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment);
        let eku = leaf.extension::<ExtendedKeyUsage>().unwrap().unwrap();
        assert_eq!(eku.usage, vec![ExtendedKeyUsageOption::ServerAuth]);

        let aki = leaf.extension::<AuthorityKeyIdentifier>().unwrap().unwrap();
        let ca_ski = ca.cert.extension::<SubjectKeyIdentifier>().unwrap().unwrap();
        assert_eq!(aki.key_identifier, ca_ski.key_identifier);
    }

    #[test]
    fn test_ca_key_usage() {
        let key = KeyPair::generate_ecdsa_p256();
        let cert = Certificate::new_self_signed(&template(&key, "Root", true), &key).unwrap();
        let ku = cert.extension::<KeyUsage>().unwrap().unwrap();
        assert_eq!(ku.0, KeyUsages::KeyCertSign | KeyUsages::CRLSign);
        assert!(cert.extension::<ExtendedKeyUsage>().unwrap().is_none());

        let exts = cert.inner.tbs_certificate.extensions.as_ref().unwrap();
        assert_eq!(exts[0].extn_id, BasicConstraints::OID);
        assert!(exts[0].critical);
    }

    #[test]
    fn test_template_extensions_follow_issuer_extensions() {
        let key = KeyPair::generate_ecdsa_p256();
        let mut tpl = template(&key, "san.test", false);
        let san = SubjectAltName {
            dns_names: vec!["san.test".to_string()],
            ..Default::default()
        };
        tpl.extensions = vec![ExtensionParam::from_extension(san.clone(), false).unwrap()];
        let cert = Certificate::new_self_signed(&tpl, &key).unwrap();

        let exts = cert.inner.tbs_certificate.extensions.as_ref().unwrap();
        assert_eq!(exts.last().unwrap().extn_id, SubjectAltName::OID);
        assert_eq!(cert.extension::<SubjectAltName>().unwrap().unwrap(), san);
    }

    #[test]
    fn test_duplicate_extension_is_rejected() {
        let key = KeyPair::generate_ecdsa_p256();
        let mut tpl = template(&key, "dup.test", false);
        tpl.extensions = vec![
            ExtensionParam::from_extension(
                BasicConstraints {
                    is_ca: true,
                    max_path_length: None,
                },
                true,
            )
            .unwrap(),
        ];
        assert!(matches!(
            Certificate::new_self_signed(&tpl, &key),
            Err(CertMintError::InvalidInput(_))
        ));
    }
}
