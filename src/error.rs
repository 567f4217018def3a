//! use certmint::error::CertMintError;

use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`CertMintError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied input was rejected before any key material was produced.
    Validation,
    /// Key generation, signing, encoding or verification failed.
    Crypto,
    /// Signing material could not be read, or output could not be written.
    Io,
}

/// Represents errors that can occur while issuing certificates and requests.
///
/// Every issuance call surfaces exactly one of these; nothing is retried internally.
#[derive(Debug, Error)]
pub enum CertMintError {
    /// No output name was given.
    #[error("a name is required to issue certificate material")]
    MissingName,

    /// The validity window is empty or negative.
    #[error("validity duration must be positive, got {0}")]
    InvalidDuration(time::Duration),

    /// A custom extension entry lacks the `oid:value` separator.
    #[error("invalid extension string '{0}'")]
    InvalidExtensionFormat(String),

    /// A custom extension entry carries an unparseable OID.
    #[error("'{component}' is not a valid OID for extension '{entry}'")]
    InvalidOid { component: String, entry: String },

    /// A certificate policy is not a dotted OID.
    #[error("'{0}' is not a valid certificate policy OID")]
    InvalidPolicy(String),

    /// An IP subject alternative name is not an IPv4 or IPv6 literal.
    #[error("'{0}' is not a valid IP address")]
    InvalidIpAddress(String),

    /// The signing certificate, key and password were not supplied together.
    #[error("incomplete signing material: {0}")]
    IncompleteSigningChain(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested key algorithm is not known.
    #[error("unsupported key algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// A key was asked to sign with an algorithm of another key type.
    #[error("a {key} key cannot sign with {requested}")]
    AlgorithmMismatch { key: String, requested: String },

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error while producing a signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// A signature did not verify.
    #[error("Signature verification failed: {0}")]
    VerificationError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// The signing CA private key could not be read, decrypted or parsed.
    #[error("unable to load signing key '{}': {reason}", .path.display())]
    CaKeyLoad { path: PathBuf, reason: String },

    /// The signing CA certificate could not be read or parsed.
    #[error("unable to load signing certificate '{}': {reason}", .path.display())]
    CaCertLoad { path: PathBuf, reason: String },

    /// An output file is already present and `force` was not set.
    #[error("output file '{}' already exists, use force to overwrite it", .0.display())]
    OutputExists(PathBuf),

    /// A filesystem operation failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CertMintError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CertMintError::MissingName
            | CertMintError::InvalidDuration(_)
            | CertMintError::InvalidExtensionFormat(_)
            | CertMintError::InvalidOid { .. }
            | CertMintError::InvalidPolicy(_)
            | CertMintError::InvalidIpAddress(_)
            | CertMintError::IncompleteSigningChain(_)
            | CertMintError::InvalidInput(_)
            | CertMintError::UnsupportedAlgorithm(_) => ErrorKind::Validation,
            CertMintError::AlgorithmMismatch { .. }
            | CertMintError::KeyGenerationError(_)
            | CertMintError::SigningError(_)
            | CertMintError::VerificationError(_)
            | CertMintError::EncodingError(_)
            | CertMintError::DecodingError(_) => ErrorKind::Crypto,
            CertMintError::CaKeyLoad { .. }
            | CertMintError::CaCertLoad { .. }
            | CertMintError::OutputExists(_)
            | CertMintError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CertMintError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CertMintError>;

impl From<der::Error> for CertMintError {
    /// Converts a `der::Error` into a `CertMintError`.
    fn from(err: der::Error) -> Self {
        CertMintError::EncodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertMintError {
    fn from(err: rsa::Error) -> Self {
        CertMintError::KeyGenerationError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertMintError {
    fn from(err: pkcs8::Error) -> Self {
        CertMintError::EncodingError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_messages() {
        let err = CertMintError::InvalidExtensionFormat("coucou".to_string());
        assert_eq!(err.to_string(), "invalid extension string 'coucou'");

        let err = CertMintError::InvalidOid {
            component: "coucou".to_string(),
            entry: "coucou:coucou".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'coucou' is not a valid OID for extension 'coucou:coucou'"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            CertMintError::OutputExists(PathBuf::from("/tmp/a-cert.pem")).kind(),
            ErrorKind::Io
        );
        assert_eq!(
            CertMintError::SigningError("boom".to_string()).kind(),
            ErrorKind::Crypto
        );
        assert_eq!(CertMintError::MissingName.kind(), ErrorKind::Validation);
    }
}
