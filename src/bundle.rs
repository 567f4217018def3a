//! PKCS#12 bundles.

use crate::cert::Certificate;
use crate::error::{CertMintError, Result};
use crate::key::KeyPair;

/// Bundles a certificate and its private key into a PKCS#12 archive.
///
/// When `ca` is given, the issuing CA certificate is added to the archive.
/// `friendly_name` labels the key and certificate bags.
pub fn to_pkcs12(
    cert: &Certificate,
    key: &KeyPair,
    ca: Option<&Certificate>,
    password: &str,
    friendly_name: &str,
) -> Result<Vec<u8>> {
    let cert_der = cert.to_der()?;
    let key_der = key.to_pkcs8_der()?;
    let ca_der = ca.map(Certificate::to_der).transpose()?;

    let pfx = p12::PFX::new(
        &cert_der,
        key_der.as_bytes(),
        ca_der.as_deref(),
        password,
        friendly_name,
    )
    .ok_or_else(|| CertMintError::EncodingError("unable to build PKCS#12 bundle".to_string()))?;

    tracing::debug!(name = friendly_name, with_ca = ca.is_some(), "built PKCS#12 bundle");
    Ok(pfx.to_der())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{CertificateTemplate, DistinguishedName, Validity};

    #[test]
    fn test_bundle_contents() {
        let key = KeyPair::generate_ecdsa_p256();
        let template = CertificateTemplate::builder()
            .subject(
                DistinguishedName::builder()
                    .common_name("bundle.test")
                    .build()
                    .as_x509_name()
                    .unwrap(),
            )
            .subject_public_key(key.as_spki().unwrap())
            .validity(Validity::from_now(time::Duration::days(1)).unwrap())
            .build();
        let cert = Certificate::new_self_signed(&template, &key).unwrap();

        let der = to_pkcs12(&cert, &key, None, "bundle-pass", "bundle").unwrap();
        let pfx = p12::PFX::parse(&der).unwrap();
        assert!(pfx.verify_mac("bundle-pass"));
        assert!(!pfx.verify_mac("wrong"));

        let certs = pfx.cert_x509_bags("bundle-pass").unwrap();
        assert_eq!(certs, vec![cert.to_der().unwrap()]);
        let keys = pfx.key_bags("bundle-pass").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0], key.to_pkcs8_der().unwrap().as_bytes());
    }
}
