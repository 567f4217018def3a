pub mod algorithm;

pub use algorithm::{AlgorithmSelection, KeyAlgorithm};

use std::fmt;

use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1, SECP_384_R_1};
use der::Encode;
use der::oid::ObjectIdentifier;
use p256::ecdsa::{
    DerSignature as P256Signature, SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey,
};
use p384::ecdsa::{
    DerSignature as P384Signature, SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey,
};
use pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncryptedPrivateKeyInfo, LineEnding,
    PrivateKeyInfo, SecretDocument,
};
use rand_core::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::error::{CertMintError, Result};

/// Supported key types for certificate operations.
#[derive(Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("type", &self.key_type())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CertMintError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let signing_key = P256SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let signing_key = P384SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Human readable key type, used in errors and logs.
    pub fn key_type(&self) -> &'static str {
        match self {
            KeyPair::Rsa { .. } => "RSA",
            KeyPair::EcdsaP256 { .. } => "ECDSA P-256",
            KeyPair::EcdsaP384 { .. } => "ECDSA P-384",
        }
    }

    /// The only signature algorithm this key signs with.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
        }
    }

    /// Signs `data` with the key's own signature algorithm.
    ///
    /// ECDSA signatures are DER encoded, as X.509 and PKCS#10 expect.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_error = |e: rsa::signature::Error| CertMintError::SigningError(e.to_string());
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new((**private).clone());
                let signature = signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_bytes().to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: P256Signature = signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: P384Signature = signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.as_bytes().to_vec())
            }
        }
    }

    /// Signs `data`, refusing any algorithm that does not belong to this key type.
    pub fn sign_with(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        if algorithm != self.signature_algorithm() {
            return Err(CertMintError::AlgorithmMismatch {
                key: self.key_type().to_string(),
                requested: algorithm.to_string(),
            });
        }
        self.sign_data(data)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// The subject public key info of this key pair.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        self.public_key().to_spki()
    }

    /// Unencrypted PKCS#8 DER encoding of the private key.
    pub fn to_pkcs8_der(&self) -> Result<SecretDocument> {
        let document = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_der()?,
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_der()?,
            KeyPair::EcdsaP384 { signing_key, .. } => signing_key.to_pkcs8_der()?,
        };
        Ok(document)
    }

    /// PKCS#8 PEM encoding of the private key.
    ///
    /// A non-empty password produces an `ENCRYPTED PRIVATE KEY` block (PBES2);
    /// otherwise the key is stored as a plain `PRIVATE KEY` block.
    pub fn to_pkcs8_pem(&self, password: Option<&str>) -> Result<String> {
        let password = password.filter(|p| !p.is_empty());
        match self {
            KeyPair::Rsa { private, .. } => encode_private_key(&**private, password),
            KeyPair::EcdsaP256 { signing_key, .. } => encode_private_key(signing_key, password),
            KeyPair::EcdsaP384 { signing_key, .. } => encode_private_key(signing_key, password),
        }
    }

    /// Decodes a private key from PEM.
    ///
    /// Accepts PKCS#8 (`PRIVATE KEY`, or `ENCRYPTED PRIVATE KEY` with `password`),
    /// PKCS#1 (`RSA PRIVATE KEY`) and SEC1 (`EC PRIVATE KEY`) blocks.
    pub fn from_pem(pem_str: &str, password: Option<&str>) -> Result<Self> {
        let block = pem::parse(pem_str).map_err(|e| CertMintError::DecodingError(e.to_string()))?;
        match block.tag() {
            "ENCRYPTED PRIVATE KEY" => {
                let password = password.filter(|p| !p.is_empty()).ok_or_else(|| {
                    CertMintError::DecodingError(
                        "private key is encrypted but no password was given".to_string(),
                    )
                })?;
                let info = EncryptedPrivateKeyInfo::try_from(block.contents())
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
                let document = info.decrypt(password).map_err(|e| {
                    CertMintError::DecodingError(format!("unable to decrypt private key: {e}"))
                })?;
                Self::from_pkcs8_der(document.as_bytes())
            }
            "PRIVATE KEY" => Self::from_pkcs8_der(block.contents()),
            "RSA PRIVATE KEY" => {
                let private = RsaPrivateKey::from_pkcs1_der(block.contents())
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
                Ok(Self::from_rsa(private))
            }
            "EC PRIVATE KEY" => {
                if let Ok(secret) = p256::SecretKey::from_sec1_der(block.contents()) {
                    return Ok(Self::from_p256(P256SigningKey::from(secret)));
                }
                let secret = p384::SecretKey::from_sec1_der(block.contents())
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
                Ok(Self::from_p384(P384SigningKey::from(secret)))
            }
            other => Err(CertMintError::DecodingError(format!(
                "unsupported private key PEM block '{other}'"
            ))),
        }
    }

    /// Decodes an unencrypted PKCS#8 DER private key of any supported type.
    pub fn from_pkcs8_der(der_bytes: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der_bytes)
            .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
        match info.algorithm.oid {
            RSA_ENCRYPTION => {
                let private = RsaPrivateKey::from_pkcs8_der(der_bytes)
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
                Ok(Self::from_rsa(private))
            }
            ID_EC_PUBLIC_KEY => {
                let curve = info
                    .algorithm
                    .parameters_oid()
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
                match curve {
                    SECP_256_R_1 => Ok(Self::from_p256(
                        P256SigningKey::from_pkcs8_der(der_bytes)
                            .map_err(|e| CertMintError::DecodingError(e.to_string()))?,
                    )),
                    SECP_384_R_1 => Ok(Self::from_p384(
                        P384SigningKey::from_pkcs8_der(der_bytes)
                            .map_err(|e| CertMintError::DecodingError(e.to_string()))?,
                    )),
                    other => Err(CertMintError::UnsupportedAlgorithm(format!(
                        "elliptic curve {other}"
                    ))),
                }
            }
            other => Err(CertMintError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn from_rsa(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    fn from_p256(signing_key: P256SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    fn from_p384(signing_key: P384SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }
}

fn encode_private_key<K: EncodePrivateKey>(key: &K, password: Option<&str>) -> Result<String> {
    let pem = match password {
        Some(password) => key.to_pkcs8_encrypted_pem(OsRng, password, LineEnding::LF)?,
        None => key.to_pkcs8_pem(LineEnding::LF)?,
    };
    Ok(pem.as_str().to_owned())
}

/// Public half of a [`KeyPair`], or a key taken from a certificate or request.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
        }
    }

    /// Decodes a public key from a subject public key info structure.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der_bytes = spki.to_der()?;
        match spki.algorithm.oid {
            RSA_ENCRYPTION => Ok(PublicKey::Rsa(
                RsaPublicKey::from_public_key_der(&der_bytes)
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?,
            )),
            ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .ok_or_else(|| {
                        CertMintError::DecodingError("EC public key without a curve".to_string())
                    })?
                    .decode_as::<ObjectIdentifier>()
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
                match curve {
                    SECP_256_R_1 => Ok(PublicKey::EcdsaP256(
                        P256VerifyingKey::from_public_key_der(&der_bytes)
                            .map_err(|e| CertMintError::DecodingError(e.to_string()))?,
                    )),
                    SECP_384_R_1 => Ok(PublicKey::EcdsaP384(
                        P384VerifyingKey::from_public_key_der(&der_bytes)
                            .map_err(|e| CertMintError::DecodingError(e.to_string()))?,
                    )),
                    other => Err(CertMintError::UnsupportedAlgorithm(format!(
                        "elliptic curve {other}"
                    ))),
                }
            }
            other => Err(CertMintError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let encoding_error =
            |e: x509_cert::spki::Error| CertMintError::EncodingError(e.to_string());
        match self {
            PublicKey::Rsa(public) => {
                SubjectPublicKeyInfoOwned::from_key(public.clone()).map_err(encoding_error)
            }
            PublicKey::EcdsaP256(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key).map_err(encoding_error)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key).map_err(encoding_error)
            }
        }
    }

    /// SHA-1 over the subject public key bits, as used by SKI/AKI extensions.
    pub fn key_identifier(&self) -> Result<Vec<u8>> {
        let spki = self.to_spki()?;
        let digest = <sha1::Sha1 as sha1::Digest>::digest(spki.subject_public_key.raw_bytes());
        Ok(digest.to_vec())
    }

    /// Verifies `signature` over `message` with the given algorithm.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let verification_error =
            |e: rsa::signature::Error| CertMintError::VerificationError(e.to_string());
        match (self, algorithm) {
            (PublicKey::Rsa(public), SignatureAlgorithm::Sha256WithRSA) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
                let signature =
                    rsa::pkcs1v15::Signature::try_from(signature).map_err(verification_error)?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(verification_error)
            }
            (PublicKey::EcdsaP256(verifying_key), SignatureAlgorithm::Sha256WithECDSA) => {
                let signature = P256Signature::try_from(signature).map_err(verification_error)?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(verification_error)
            }
            (PublicKey::EcdsaP384(verifying_key), SignatureAlgorithm::Sha384WithECDSA) => {
                let signature = P384Signature::try_from(signature).map_err(verification_error)?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(verification_error)
            }
            (key, algorithm) => Err(CertMintError::AlgorithmMismatch {
                key: key.key_type().to_string(),
                requested: algorithm.to_string(),
            }),
        }
    }

    pub fn key_type(&self) -> &'static str {
        match self {
            PublicKey::Rsa(_) => "RSA",
            PublicKey::EcdsaP256(_) => "ECDSA P-256",
            PublicKey::EcdsaP384(_) => "ECDSA P-384",
        }
    }

    /// Whether two keys encode to the same subject public key info.
    pub fn matches(&self, other: &PublicKey) -> Result<bool> {
        Ok(self.to_spki()?.to_der()? == other.to_spki()?.to_der()?)
    }
}
