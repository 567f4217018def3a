use std::net::IpAddr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tagged;
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec, Utf8StringRef};
use der::Tag;
use rand::RngCore;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use super::extensions::{ExtendedKeyUsageOption, SubjectAltName, ToAndFromX509Extension};
use crate::error::{CertMintError, Result};

/// Parameters for building an X.509 certificate.
///
/// # Fields
/// * `serial_number` - Big-endian serial number, random 160 bits unless set.
/// * `subject` - The encoded subject name.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `validity` - The `notBefore`/`notAfter` window.
/// * `usages` - A list of extended key usage options.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `extensions` - Additional X.509 extensions (SAN, policies, custom entries).
#[derive(Clone, Debug, Builder)]
pub struct CertificateTemplate {
    #[builder(default = random_serial_number())]
    pub serial_number: Vec<u8>,
    pub subject: Name,
    pub subject_public_key: SubjectPublicKeyInfoOwned,
    pub validity: Validity,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Draws a positive, non-zero 160-bit serial number from the thread CSPRNG.
///
/// The top bit is cleared so the DER INTEGER stays positive within 20 octets.
pub fn random_serial_number() -> Vec<u8> {
    let mut serial = vec![0u8; 20];
    rand::rng().fill_bytes(&mut serial);
    serial[0] &= 0x7F;
    serial[0] |= 0x01;
    serial
}

const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATIONAL_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const STATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const STREET: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.9");
const POSTAL_CODE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.17");
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Distinguished name parameters for building an X.509 certificate.
///
/// Every attribute except the common name is multi-valued; values keep the order
/// they were supplied in and empty lists contribute nothing to the name.
///
/// # Fields
/// * `common_name` - The common name (CN), omitted when empty.
/// * `country` - The countries (C).
/// * `state` - The states or provinces (ST).
/// * `locality` - The localities or cities (L).
/// * `street_address` - The street addresses (STREET).
/// * `postal_code` - The postal codes (postalCode).
/// * `organization` - The organizations (O).
/// * `organizational_unit` - The organizational units (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default, into)]
    pub common_name: String,
    #[builder(default)]
    pub country: Vec<String>,
    #[builder(default)]
    pub state: Vec<String>,
    #[builder(default)]
    pub locality: Vec<String>,
    #[builder(default)]
    pub street_address: Vec<String>,
    #[builder(default)]
    pub postal_code: Vec<String>,
    #[builder(default)]
    pub organization: Vec<String>,
    #[builder(default)]
    pub organizational_unit: Vec<String>,
}

impl DistinguishedName {
    /// Whether the name would encode to an empty RDN sequence.
    pub fn is_empty(&self) -> bool {
        self.attributes().next().is_none()
    }

    /// Attribute type and value pairs in encoding order (C, O, OU, L, ST, STREET, postalCode, CN).
    fn attributes(&self) -> impl Iterator<Item = (ObjectIdentifier, &str)> {
        let lists = [
            (COUNTRY, &self.country),
            (ORGANIZATION, &self.organization),
            (ORGANIZATIONAL_UNIT, &self.organizational_unit),
            (LOCALITY, &self.locality),
            (STATE, &self.state),
            (STREET, &self.street_address),
            (POSTAL_CODE, &self.postal_code),
        ];
        lists
            .into_iter()
            .flat_map(|(oid, values)| values.iter().map(move |value| (oid, value.as_str())))
            .chain(
                Some((COMMON_NAME, self.common_name.as_str())).filter(|(_, cn)| !cn.is_empty()),
            )
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Each value becomes its own RDN. Values are PrintableString when they fit
    /// that alphabet and UTF8String otherwise.
    pub fn as_x509_name(&self) -> Result<Name> {
        let rdns = self
            .attributes()
            .map(|(oid, value)| {
                let value = encode_attribute_value(value)?;
                let atv = AttributeTypeAndValue { oid, value };
                Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Attributes of other types, or with values that are not strings, are skipped.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = decode_attribute_value(&attr.value) else {
                    continue;
                };
                match attr.oid {
                    COUNTRY => dn.country.push(value),
                    ORGANIZATION => dn.organization.push(value),
                    ORGANIZATIONAL_UNIT => dn.organizational_unit.push(value),
                    LOCALITY => dn.locality.push(value),
                    STATE => dn.state.push(value),
                    STREET => dn.street_address.push(value),
                    POSTAL_CODE => dn.postal_code.push(value),
                    COMMON_NAME => dn.common_name = value,
                    _ => {}
                }
            }
        }
        dn
    }
}

fn encode_attribute_value(value: &str) -> Result<Any> {
    let encoded = match PrintableStringRef::new(value) {
        Ok(printable) => Any::encode_from(&printable),
        Err(_) => Any::encode_from(&Utf8StringRef::new(value)?),
    };
    encoded.map_err(|e| CertMintError::InvalidInput(format!("name attribute '{value}': {e}")))
}

fn decode_attribute_value(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String => value.decode_as::<String>().ok(),
        Tag::PrintableString => value
            .decode_as::<PrintableStringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        Tag::Ia5String => value
            .decode_as::<Ia5StringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// Subject alternative names as supplied by the caller.
///
/// IP literals are kept as text until [`AltNames::parse`] validates them.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct AltNames {
    #[builder(default)]
    pub dns: Vec<String>,
    #[builder(default)]
    pub ips: Vec<String>,
    #[builder(default)]
    pub emails: Vec<String>,
}

impl AltNames {
    pub fn is_empty(&self) -> bool {
        self.dns.is_empty() && self.ips.is_empty() && self.emails.is_empty()
    }

    /// Validates every entry, failing on the first IP literal that does not parse.
    pub fn parse(&self) -> Result<SubjectAltName> {
        let ip_addresses = self
            .ips
            .iter()
            .map(|ip| {
                ip.trim()
                    .parse::<IpAddr>()
                    .map_err(|_| CertMintError::InvalidIpAddress(ip.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SubjectAltName {
            dns_names: self.dns.clone(),
            ip_addresses,
            emails: self.emails.clone(),
        })
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now and lasting `duration`.
    ///
    /// Fails with `InvalidDuration` when the end falls outside the representable range.
    pub fn from_now(duration: Duration) -> Result<Self> {
        let now = OffsetDateTime::now_utc();
        let not_after = now
            .checked_add(duration)
            .ok_or(CertMintError::InvalidDuration(duration))?;
        Ok(Self {
            not_before: now,
            not_after,
        })
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The extension value, placed verbatim in `extnValue`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        let value = extension.to_x509_extension_value()?;
        Ok(Self {
            oid: E::OID,
            critical,
            value,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }

    pub fn to_x509_extension(&self) -> Result<Extension> {
        Ok(Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())?,
        })
    }
}

impl From<&Extension> for ExtensionParam {
    fn from(ext: &Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}
