//! Custom extensions written as `<dotted-oid>:<raw value>`.
//!
//! The first `:` separates the OID from the value. Everything after it,
//! further colons included, is the extension value, placed verbatim in
//! `extnValue`.

use const_oid::ObjectIdentifier;

use super::params::ExtensionParam;
use crate::error::{CertMintError, Result};

/// A custom extension parsed from its textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomExtension {
    pub oid: ObjectIdentifier,
    pub value: Vec<u8>,
}

impl CustomExtension {
    /// Parses a single `oid:value` entry.
    pub fn parse(entry: &str) -> Result<Self> {
        let (oid_str, value) = entry
            .split_once(':')
            .ok_or_else(|| CertMintError::InvalidExtensionFormat(entry.to_string()))?;

        let invalid_oid = |component: &str| CertMintError::InvalidOid {
            component: component.to_string(),
            entry: entry.to_string(),
        };

        if let Some(component) = oid_str
            .split('.')
            .find(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(invalid_oid(component));
        }

        // Arcs are numeric but may still break X.660 (single arc, first arc > 2, overflow).
        let oid = ObjectIdentifier::new(oid_str).map_err(|_| invalid_oid(oid_str))?;

        Ok(Self {
            oid,
            value: value.as_bytes().to_vec(),
        })
    }

    /// Custom extensions are never critical.
    pub fn to_param(&self) -> ExtensionParam {
        ExtensionParam {
            oid: self.oid,
            critical: false,
            value: self.value.clone(),
        }
    }
}

/// Parses every entry, preserving input order.
///
/// Returns `None` when no entries were supplied at all, so callers can tell
/// "nothing requested" apart from a non-empty request. The first malformed
/// entry aborts the whole parse.
pub fn parse_extensions<S: AsRef<str>>(entries: &[S]) -> Result<Option<Vec<CustomExtension>>> {
    if entries.is_empty() {
        return Ok(None);
    }
    entries
        .iter()
        .map(|entry| CustomExtension::parse(entry.as_ref()))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_extension() {
        let parsed = parse_extensions(&["1.2.3:coucou bro"]).unwrap().unwrap();
        assert_eq!(
            parsed,
            vec![CustomExtension {
                oid: ObjectIdentifier::new_unwrap("1.2.3"),
                value: b"coucou bro".to_vec(),
            }]
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let parsed = parse_extensions(&["1.2.3:coucou bro", "1.2.2:coucou2"])
            .unwrap()
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].oid, ObjectIdentifier::new_unwrap("1.2.3"));
        assert_eq!(parsed[0].value, b"coucou bro");
        assert_eq!(parsed[1].oid, ObjectIdentifier::new_unwrap("1.2.2"));
        assert_eq!(parsed[1].value, b"coucou2");
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let parsed = parse_extensions(&["1.2.3:a:b::c"]).unwrap().unwrap();
        assert_eq!(parsed[0].value, b"a:b::c");

        let parsed = parse_extensions(&["1.2.3:"]).unwrap().unwrap();
        assert!(parsed[0].value.is_empty());
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_extensions(&["coucou"]).unwrap_err();
        assert_eq!(err.to_string(), "invalid extension string 'coucou'");
    }

    #[test]
    fn test_non_numeric_oid() {
        let err = parse_extensions(&["coucou:coucou"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'coucou' is not a valid OID for extension 'coucou:coucou'"
        );

        let err = parse_extensions(&["1.coucou.3:coucou"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'coucou' is not a valid OID for extension '1.coucou.3:coucou'"
        );
    }

    #[test]
    fn test_unencodable_oid() {
        let err = parse_extensions(&["1:x"]).unwrap_err();
        assert_eq!(err.to_string(), "'1' is not a valid OID for extension '1:x'");

        let err = parse_extensions(&["1..3:x"]).unwrap_err();
        assert!(matches!(
            err,
            CertMintError::InvalidOid { ref component, .. } if component.is_empty()
        ));
    }

    #[test]
    fn test_absent_versus_empty() {
        let none: [&str; 0] = [];
        assert_eq!(parse_extensions(&none).unwrap(), None);

        let err = parse_extensions(&["1.2.3:ok", "broken"]).unwrap_err();
        assert!(matches!(err, CertMintError::InvalidExtensionFormat(_)));
    }

    #[test]
    fn test_param_is_not_critical() {
        let ext = CustomExtension::parse("1.3.6.1.4.1.99999.1:hello").unwrap();
        let param = ext.to_param();
        assert!(!param.critical);
        assert_eq!(param.value, b"hello");
    }
}
