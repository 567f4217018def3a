use std::fmt;
use std::str::FromStr;

use crate::cert::SignatureAlgorithm;
use crate::error::{CertMintError, Result};
use crate::key::KeyPair;

/// Key algorithms that can back a certificate or request.
///
/// The key type and the signature algorithm are coupled: a key produced for one
/// variant only ever signs with [`KeyAlgorithm::signature_algorithm`] of that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAlgorithm {
    Rsa2048,
    Rsa3072,
    Rsa4096,
    #[default]
    EcdsaP256,
    EcdsaP384,
}

/// A key generator paired with the signature algorithm its keys sign with.
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmSelection {
    pub generate: fn() -> Result<KeyPair>,
    pub signature: SignatureAlgorithm,
}

impl KeyAlgorithm {
    /// Maps the algorithm to its key generator and certificate signature algorithm.
    pub fn select(self) -> AlgorithmSelection {
        match self {
            KeyAlgorithm::Rsa2048 => AlgorithmSelection {
                generate: || KeyPair::generate_rsa(2048),
                signature: SignatureAlgorithm::Sha256WithRSA,
            },
            KeyAlgorithm::Rsa3072 => AlgorithmSelection {
                generate: || KeyPair::generate_rsa(3072),
                signature: SignatureAlgorithm::Sha256WithRSA,
            },
            KeyAlgorithm::Rsa4096 => AlgorithmSelection {
                generate: || KeyPair::generate_rsa(4096),
                signature: SignatureAlgorithm::Sha256WithRSA,
            },
            KeyAlgorithm::EcdsaP256 => AlgorithmSelection {
                generate: || Ok(KeyPair::generate_ecdsa_p256()),
                signature: SignatureAlgorithm::Sha256WithECDSA,
            },
            KeyAlgorithm::EcdsaP384 => AlgorithmSelection {
                generate: || Ok(KeyPair::generate_ecdsa_p384()),
                signature: SignatureAlgorithm::Sha384WithECDSA,
            },
        }
    }

    /// Generates a fresh key pair for this algorithm.
    pub fn generate(self) -> Result<KeyPair> {
        tracing::debug!(algorithm = %self, "generating key pair");
        (self.select().generate)()
    }

    pub fn signature_algorithm(self) -> SignatureAlgorithm {
        self.select().signature
    }
}

impl FromStr for KeyAlgorithm {
    type Err = CertMintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsa" | "rsa2048" | "rsa-2048" => Ok(KeyAlgorithm::Rsa2048),
            "rsa3072" | "rsa-3072" => Ok(KeyAlgorithm::Rsa3072),
            "rsa4096" | "rsa-4096" => Ok(KeyAlgorithm::Rsa4096),
            "ecdsa" | "ec" | "ecdsa-p256" | "p256" | "p-256" => Ok(KeyAlgorithm::EcdsaP256),
            "ecdsa-p384" | "p384" | "p-384" => Ok(KeyAlgorithm::EcdsaP384),
            _ => Err(CertMintError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyAlgorithm::Rsa2048 => "rsa2048",
            KeyAlgorithm::Rsa3072 => "rsa3072",
            KeyAlgorithm::Rsa4096 => "rsa4096",
            KeyAlgorithm::EcdsaP256 => "ecdsa-p256",
            KeyAlgorithm::EcdsaP384 => "ecdsa-p384",
        };
        f.write_str(name)
    }
}
