//! # CertMint - A Pure Rust Local Certificate Authority
//!
//! CertMint issues the material a small private PKI needs: self-signed or
//! chain-signed CA certificates, leaf certificates for servers, clients and
//! email, and PKCS#10 certificate signing requests. It is built entirely on
//! rustcrypto libraries, without ring or openssl (except for testing).
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048, 3072, and 4096-bit keys, signed with SHA-256
//! - **ECDSA**: P-256 (SHA-256) and P-384 (SHA-384)
//!
//! ## Output
//!
//! Each issuance writes PEM files under the output directory, named after the
//! configured `name`:
//!
//! - `<name>-key.pem`: PKCS#8 private key, encrypted when a password is set
//! - `<name>-cert.pem`: certificate
//! - `<name>-csr.pem`: certificate signing request
//! - `<name>.p12`: optional PKCS#12 bundle
//!
//! Files are written as a group: either every artifact of a call lands on
//! disk, or none does. Existing files are only replaced with `force`.
//!
//! ## Quick Start
//!
//! ### Creating a Root CA and a Server Certificate
//!
//! ```rust,no_run
//! use certmint::{
//!     cert::params::{AltNames, DistinguishedName},
//!     config::CertificateConfig,
//!     issue::{issue_ca, issue_leaf},
//! };
//!
//! # fn main() -> Result<(), certmint::error::CertMintError> {
//! let root = issue_ca(
//!     &CertificateConfig::builder()
//!         .name("root")
//!         .subject(
//!             DistinguishedName::builder()
//!                 .common_name("Example Root CA")
//!                 .organization(vec!["Example Corp".to_string()])
//!                 .build(),
//!         )
//!         .password("ca secret")
//!         .out("certs")
//!         .build(),
//! )?;
//!
//! let server = issue_leaf(
//!     &CertificateConfig::builder()
//!         .name("server")
//!         .subject(DistinguishedName::builder().common_name("server.example.com").build())
//!         .alt_names(
//!             AltNames::builder()
//!                 .dns(vec!["server.example.com".to_string()])
//!                 .ips(vec!["10.0.0.12".to_string()])
//!                 .build(),
//!         )
//!         .auth_server(true)
//!         .signing_cert(root.certificate)
//!         .signing_key(root.key)
//!         .signing_key_password("ca secret")
//!         .p12(true)
//!         .p12_password("bundle secret")
//!         .out("certs")
//!         .build(),
//! )?;
//!
//! println!("server certificate: {}", server.certificate.display());
//! # Ok(())
//! # }
//! ```
//!
//! ### Custom Extensions
//!
//! Extensions not modelled by this crate are given as `<dotted-oid>:<value>`.
//! The first colon separates the OID; the rest of the entry is the raw value.
//!
//! ```rust
//! use certmint::cert::custom::parse_extensions;
//!
//! let parsed = parse_extensions(&["1.2.3:coucou bro"]).unwrap().unwrap();
//! assert_eq!(parsed[0].oid.to_string(), "1.2.3");
//! assert_eq!(parsed[0].value, b"coucou bro");
//!
//! let err = parse_extensions(&["coucou"]).unwrap_err();
//! assert_eq!(err.to_string(), "invalid extension string 'coucou'");
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`error::CertMintError`]; [`error::CertMintError::kind`]
//! sorts it into validation, crypto or I/O:
//!
//! ```rust
//! use certmint::{config::CsrConfig, error::{CertMintError, ErrorKind}, issue::issue_csr};
//!
//! let config = CsrConfig::builder().name("").out(".").build();
//! match issue_csr(&config) {
//!     Err(e @ CertMintError::MissingName) => assert_eq!(e.kind(), ErrorKind::Validation),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`issue`]: CA, leaf and CSR issuance flows
//! - [`config`]: Issuance configuration and signing-material validation
//! - [`key`]: Key generation, import/export, and algorithm selection
//! - [`cert`]: Certificate creation, encoding/decoding, names and extensions
//! - [`csr`]: PKCS#10 requests
//! - [`issuer`]: Certificate signing
//! - [`output`]: Atomic artifact writes
//! - [`bundle`]: PKCS#12 export
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure assembly

pub mod bundle;
pub mod cert;
pub mod config;
pub mod csr;
pub mod error;
pub mod issue;
pub mod issuer;
pub mod key;
pub mod output;
pub mod tbs_certificate;
