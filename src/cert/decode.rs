//! Certificate and extension decoding for every extension ID the crate can encode.
//!
//! `const-oid` encodes `1.2.3` as the two bytes `2a 03` but refuses to decode
//! OID bodies shorter than three bytes. Extension IDs are rebuilt from their
//! arcs here; every other field goes through the `x509-cert` decoders.

use const_oid::ObjectIdentifier;
use der::asn1::{AnyRef, BitString, ContextSpecific};
use der::{Decode, Reader, SliceReader, Tag, TagNumber, Tagged};
use x509_cert::certificate::{CertificateInner, TbsCertificateInner, Version};
use x509_cert::ext::Extension;

/// Decodes a DER `Certificate`.
pub(crate) fn certificate(der_bytes: &[u8]) -> der::Result<CertificateInner> {
    let mut reader = SliceReader::new(der_bytes)?;
    let cert = reader.sequence(|cert| {
        let tbs_certificate = cert.sequence(|tbs| tbs_certificate(tbs))?;
        Ok(CertificateInner {
            tbs_certificate,
            signature_algorithm: cert.decode()?,
            signature: cert.decode()?,
        })
    })?;
    reader.finish(cert)
}

fn tbs_certificate<'a, R: Reader<'a>>(tbs: &mut R) -> der::Result<TbsCertificateInner> {
    let version = ContextSpecific::<Version>::decode_explicit(tbs, TagNumber::N0)?
        .map(|field| field.value)
        .unwrap_or_default();
    let serial_number = tbs.decode()?;
    let signature = tbs.decode()?;
    let issuer = tbs.decode()?;
    let validity = tbs.decode()?;
    let subject = tbs.decode()?;
    let subject_public_key_info = tbs.decode()?;
    let issuer_unique_id = ContextSpecific::<BitString>::decode_implicit(tbs, TagNumber::N1)?
        .map(|field| field.value);
    let subject_unique_id = ContextSpecific::<BitString>::decode_implicit(tbs, TagNumber::N2)?
        .map(|field| field.value);
    let extensions = ContextSpecific::<AnyRef<'a>>::decode_explicit(tbs, TagNumber::N3)?
        .map(|field| extension_list(field.value))
        .transpose()?;

    Ok(TbsCertificateInner {
        version,
        serial_number,
        signature,
        issuer,
        validity,
        subject,
        subject_public_key_info,
        issuer_unique_id,
        subject_unique_id,
        extensions,
    })
}

/// Decodes an `Extensions` sequence, as carried by `extensionRequest`.
pub(crate) fn extension_list(list: AnyRef<'_>) -> der::Result<Vec<Extension>> {
    list.tag().assert_eq(Tag::Sequence)?;
    let mut reader = SliceReader::new(list.value())?;
    let mut extensions = Vec::new();
    while !reader.is_finished() {
        extensions.push(reader.sequence(|ext| extension(ext))?);
    }
    Ok(extensions)
}

fn extension<'a, R: Reader<'a>>(ext: &mut R) -> der::Result<Extension> {
    let id: AnyRef<'a> = ext.decode()?;
    id.tag().assert_eq(Tag::ObjectIdentifier)?;
    let critical = Option::<bool>::decode(ext)?.unwrap_or(false);
    Ok(Extension {
        extn_id: object_identifier(id.value())?,
        critical,
        extn_value: ext.decode()?,
    })
}

/// Rebuilds an OID from its BER body (X.690 §8.19).
fn object_identifier(body: &[u8]) -> der::Result<ObjectIdentifier> {
    if let Ok(oid) = ObjectIdentifier::from_bytes(body) {
        return Ok(oid);
    }

    let malformed = || Tag::ObjectIdentifier.value_error();
    let mut arcs: Vec<u32> = Vec::new();
    let mut arc: u32 = 0;
    for &byte in body {
        arc = arc
            .checked_mul(128)
            .and_then(|shifted| shifted.checked_add(u32::from(byte & 0x7f)))
            .ok_or_else(malformed)?;
        if byte & 0x80 != 0 {
            continue;
        }
        if arcs.is_empty() {
            // The first subidentifier packs the first two arcs.
            let first = (arc / 40).min(2);
            arcs.push(first);
            arcs.push(arc - first * 40);
        } else {
            arcs.push(arc);
        }
        arc = 0;
    }
    if arcs.is_empty() || body.last().is_some_and(|byte| byte & 0x80 != 0) {
        return Err(malformed());
    }

    let dotted = arcs
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".");
    ObjectIdentifier::new(&dotted).map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::Encode;
    use der::asn1::OctetString;

    #[test]
    fn test_short_oid_body() {
        let oid = ObjectIdentifier::new_unwrap("1.2.3");
        assert_eq!(oid.as_bytes(), &[0x2a, 0x03]);
        assert!(ObjectIdentifier::from_bytes(oid.as_bytes()).is_err());
        assert_eq!(object_identifier(oid.as_bytes()).unwrap(), oid);

        let long = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1");
        assert_eq!(object_identifier(long.as_bytes()).unwrap(), long);
        let joint = ObjectIdentifier::new_unwrap("2.999.3");
        assert_eq!(object_identifier(joint.as_bytes()).unwrap(), joint);
    }

    #[test]
    fn test_truncated_oid_body() {
        assert!(object_identifier(&[]).is_err());
        assert!(object_identifier(&[0x2a, 0x83]).is_err());
    }

    #[test]
    fn test_extension_list() {
        let list = vec![
            Extension {
                extn_id: ObjectIdentifier::new_unwrap("1.2.3"),
                critical: false,
                extn_value: OctetString::new(b"coucou bro".to_vec()).unwrap(),
            },
            Extension {
                extn_id: ObjectIdentifier::new_unwrap("2.5.29.19"),
                critical: true,
                extn_value: OctetString::new(vec![0x30, 0x00]).unwrap(),
            },
        ];
        let der_bytes = list.to_der().unwrap();
        let decoded = extension_list(AnyRef::from_der(&der_bytes).unwrap()).unwrap();
        assert_eq!(decoded, list);
    }
}
