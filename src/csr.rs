//! PKCS#10 certificate signing requests.
//!
//! A request is always signed by its own key. Requested extensions travel in
//! a single `extensionRequest` attribute (RFC 2985 §5.4.2).

use const_oid::db::rfc5912::ID_EXTENSION_REQ;
use der::asn1::{Any, BitString, SetOfVec};
use der::{Decode, Encode, EncodePem};
use x509_cert::attr::Attribute;
use x509_cert::name::Name;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::{SignatureAlgorithm, decode};
use crate::cert::params::ExtensionParam;
use crate::error::{CertMintError, Result};
use crate::key::{KeyPair, PublicKey};

/// A PKCS#10 certificate signing request.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub inner: CertReq,
}

impl CertificateRequest {
    /// Builds a request for `subject` and signs it with `key`.
    ///
    /// The `extensionRequest` attribute is only present when `extensions` is not empty.
    pub fn new(subject: Name, key: &KeyPair, extensions: &[ExtensionParam]) -> Result<Self> {
        let mut attributes = Vec::new();
        if !extensions.is_empty() {
            let extensions = extensions
                .iter()
                .map(ExtensionParam::to_x509_extension)
                .collect::<Result<Vec<_>>>()?;
            attributes.push(Attribute {
                oid: ID_EXTENSION_REQ,
                values: SetOfVec::try_from(vec![Any::encode_from(&extensions)?])?,
            });
        }

        let info = CertReqInfo {
            version: Version::V1,
            subject,
            public_key: key.as_spki()?,
            attributes: SetOfVec::try_from(attributes)?,
        };

        let algorithm = key.signature_algorithm();
        let signature = key.sign_with(algorithm, &info.to_der()?)?;

        tracing::debug!(subject = %info.subject, %algorithm, "signed certificate request");

        Ok(Self {
            inner: CertReq {
                info,
                algorithm: algorithm.into(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    /// Encodes the request as a `CERTIFICATE REQUEST` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    pub fn from_der(der_bytes: &[u8]) -> Result<Self> {
        let inner =
            CertReq::from_der(der_bytes).map_err(|e| CertMintError::DecodingError(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let block = pem::parse(pem_str).map_err(|e| CertMintError::DecodingError(e.to_string()))?;
        if block.tag() != "CERTIFICATE REQUEST" {
            return Err(CertMintError::DecodingError(format!(
                "expected a CERTIFICATE REQUEST PEM block, found '{}'",
                block.tag()
            )));
        }
        Self::from_der(block.contents())
    }

    pub fn subject(&self) -> &Name {
        &self.inner.info.subject
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.info.public_key
    }

    /// Checks the self-signature, i.e. that the requester holds the private key.
    pub fn verify(&self) -> Result<()> {
        let public_key = PublicKey::from_x509spki(&self.inner.info.public_key)?;
        let algorithm = SignatureAlgorithm::try_from(&self.inner.algorithm)?;
        public_key.verify(
            algorithm,
            &self.inner.info.to_der()?,
            self.inner.signature.raw_bytes(),
        )
    }

    /// Extensions carried by the `extensionRequest` attribute, in request order.
    pub fn requested_extensions(&self) -> Result<Vec<ExtensionParam>> {
        let mut requested = Vec::new();
        for attr in self.inner.info.attributes.iter() {
            if attr.oid != ID_EXTENSION_REQ {
                continue;
            }
            for value in attr.values.iter() {
                let extensions = decode::extension_list(value.into())
                    .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
                requested.extend(extensions.iter().map(ExtensionParam::from));
            }
        }
        Ok(requested)
    }
}
