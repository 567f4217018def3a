use std::net::IpAddr;

use const_oid::AssociatedOid;
use const_oid::db::rfc5912::{ID_KP_CLIENT_AUTH, ID_KP_EMAIL_PROTECTION, ID_KP_SERVER_AUTH};
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::CertMintError;

/// Typed view of one X.509 extension, encoded to and from its `extnValue` bytes.
///
/// # Example
/// ```
/// use certmint::cert::extensions::{SubjectAltName, ToAndFromX509Extension};
///
/// let san = SubjectAltName { dns_names: vec!["example.com".to_string()], ..Default::default() };
/// let value = san.to_x509_extension_value().unwrap();
/// assert_eq!(SubjectAltName::from_x509_extension_value(&value).unwrap(), san);
/// ```
pub trait ToAndFromX509Extension {
    /// `extnID` of the extension.
    const OID: ObjectIdentifier;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError>;

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError>
    where
        Self: Sized;
}

fn decode<'a, T: Decode<'a>>(value: &'a [u8]) -> Result<T, CertMintError> {
    T::from_der(value).map_err(|e| CertMintError::DecodingError(e.to_string()))
}

/// Subject alternative names. Encoded in the order DNS names, emails, IPs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub emails: Vec<String>,
}

impl SubjectAltName {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ip_addresses.is_empty() && self.emails.is_empty()
    }
}

fn ia5(value: &str, kind: &str) -> Result<Ia5String, CertMintError> {
    Ia5String::new(value)
        .map_err(|e| CertMintError::InvalidInput(format!("{kind} '{value}' is not ASCII: {e}")))
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let mut names = Vec::new();
        for dns in &self.dns_names {
            names.push(GeneralName::DnsName(ia5(dns, "DNS name")?));
        }
        for email in &self.emails {
            names.push(GeneralName::Rfc822Name(ia5(email, "email address")?));
        }
        for ip in &self.ip_addresses {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            names.push(GeneralName::IpAddress(OctetString::new(octets)?));
        }

        let san = x509_cert::ext::pkix::SubjectAltName(names);
        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let san: x509_cert::ext::pkix::SubjectAltName = decode(extension)?;
        let mut decoded = SubjectAltName::default();
        for name in san.0.iter() {
            match name {
                GeneralName::DnsName(dns) => decoded.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => decoded.emails.push(email.to_string()),
                GeneralName::IpAddress(octets) => {
                    let bytes = octets.as_bytes();
                    let ip = if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
                        IpAddr::from(v4)
                    } else if let Ok(v6) = <[u8; 16]>::try_from(bytes) {
                        IpAddr::from(v6)
                    } else {
                        return Err(CertMintError::DecodingError(format!(
                            "IP address SAN of {} bytes",
                            bytes.len()
                        )));
                    };
                    decoded.ip_addresses.push(ip);
                }
                other => {
                    return Err(CertMintError::DecodingError(format!(
                        "unsupported subject alternative name {other:?}"
                    )));
                }
            }
        }
        Ok(decoded)
    }
}

/// `cA` flag plus an optional `pathLenConstraint`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        Ok(x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        }
        .to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let constraints: x509_cert::ext::pkix::BasicConstraints = decode(extension)?;
        Ok(Self {
            is_ca: constraints.ca,
            max_path_length: constraints.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        Ok(X509KeyUsage(self.0).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        decode::<X509KeyUsage>(extension).map(|usage| Self(usage.0))
    }
}

/// Purposes the certified key may be used for, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let purposes = self.usage.iter().copied().map(ObjectIdentifier::from).collect();
        Ok(x509_cert::ext::pkix::ExtendedKeyUsage(purposes).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let purposes: x509_cert::ext::pkix::ExtendedKeyUsage = decode(extension)?;
        let usage = purposes
            .0
            .iter()
            .map(ExtendedKeyUsageOption::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { usage })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    EmailProtection,
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(purpose: ExtendedKeyUsageOption) -> Self {
        match purpose {
            ExtendedKeyUsageOption::ServerAuth => ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::EmailProtection => ID_KP_EMAIL_PROTECTION,
        }
    }
}

impl TryFrom<&ObjectIdentifier> for ExtendedKeyUsageOption {
    type Error = CertMintError;

    fn try_from(oid: &ObjectIdentifier) -> Result<Self, Self::Error> {
        match *oid {
            ID_KP_SERVER_AUTH => Ok(Self::ServerAuth),
            ID_KP_CLIENT_AUTH => Ok(Self::ClientAuth),
            ID_KP_EMAIL_PROTECTION => Ok(Self::EmailProtection),
            other => Err(CertMintError::DecodingError(format!(
                "unsupported extended key usage {other}"
            ))),
        }
    }
}

/// SHA-1 of the subject public key bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let id = OctetString::new(self.key_identifier.as_slice())?;
        Ok(x509_cert::ext::pkix::SubjectKeyIdentifier(id).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let ski: x509_cert::ext::pkix::SubjectKeyIdentifier = decode(extension)?;
        Ok(Self {
            key_identifier: ski.0.into_bytes(),
        })
    }
}

/// Points at the issuer's key. Only the `keyIdentifier` form is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        Ok(x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        }
        .to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let aki: x509_cert::ext::pkix::AuthorityKeyIdentifier = decode(extension)?;
        Ok(Self {
            key_identifier: aki.key_identifier.map(OctetString::into_bytes).unwrap_or_default(),
        })
    }
}

/// Policy identifiers without qualifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificatePolicies {
    pub policies: Vec<ObjectIdentifier>,
}

impl CertificatePolicies {
    /// Parses dotted policy OIDs, rejecting the first one that is malformed.
    pub fn parse(policies: &[String]) -> Result<Self, CertMintError> {
        let policies = policies
            .iter()
            .map(|policy| {
                ObjectIdentifier::new(policy.trim())
                    .map_err(|_| CertMintError::InvalidPolicy(policy.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { policies })
    }
}

impl ToAndFromX509Extension for CertificatePolicies {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::CertificatePolicies::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let policies = x509_cert::ext::pkix::CertificatePolicies(
            self.policies
                .iter()
                .map(|oid| x509_cert::ext::pkix::certpolicy::PolicyInformation {
                    policy_identifier: *oid,
                    policy_qualifiers: None,
                })
                .collect(),
        );
        Ok(policies.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let policies: x509_cert::ext::pkix::CertificatePolicies = decode(extension)?;
        Ok(Self {
            policies: policies.0.iter().map(|p| p.policy_identifier).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reencode<E: ToAndFromX509Extension>(ext: &E) -> E {
        E::from_x509_extension_value(&ext.to_x509_extension_value().unwrap()).unwrap()
    }

    #[test]
    fn test_ca_constraints_keep_path_length() {
        let constraints = BasicConstraints {
            is_ca: true,
            max_path_length: Some(0),
        };
        assert_eq!(reencode(&constraints), constraints);
        assert_eq!(reencode(&BasicConstraints::default()).max_path_length, None);
    }

    #[test]
    fn test_subject_alt_name_mixed_entries() {
        let san = SubjectAltName {
            dns_names: vec!["demo.com".to_string()],
            ip_addresses: vec!["192.169.0.1".parse().unwrap(), "::1".parse().unwrap()],
            emails: vec!["ops@demo.com".to_string()],
        };
        assert_eq!(reencode(&san), san);
    }

    #[test]
    fn test_subject_alt_name_rejects_non_ascii_dns() {
        let san = SubjectAltName {
            dns_names: vec!["bücher.example".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            san.to_x509_extension_value(),
            Err(CertMintError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_usages() {
        let usage = KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign);
        assert_eq!(reencode(&usage), usage);

        let purposes = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::EmailProtection,
                ExtendedKeyUsageOption::ServerAuth,
            ],
        };
        assert_eq!(reencode(&purposes), purposes);
    }

    #[test]
    fn test_unknown_extended_key_usage() {
        let code_signing = x509_cert::ext::pkix::ExtendedKeyUsage(vec![
            const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
        ]);
        let err =
            ExtendedKeyUsage::from_x509_extension_value(&code_signing.to_der().unwrap())
                .unwrap_err();
        assert!(matches!(err, CertMintError::DecodingError(_)));
    }

    #[test]
    fn test_certificate_policies() {
        let parsed =
            CertificatePolicies::parse(&["1.3.6.1.4.1.44947.1.1.1".to_string()]).unwrap();
        assert_eq!(reencode(&parsed), parsed);

        let err = CertificatePolicies::parse(&["not-an-oid".to_string()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'not-an-oid' is not a valid certificate policy OID"
        );
    }
}
