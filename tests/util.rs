#![allow(dead_code)]

use std::path::Path;

use certmint::cert::params::DistinguishedName;
use certmint::cert::Certificate;
use certmint::config::{CertificateConfig, CsrConfig};
use certmint::csr::CertificateRequest;
use certmint::issue::{CertifiedFiles, issue_ca};
use certmint::key::KeyPair;

pub fn ca_subject() -> DistinguishedName {
    DistinguishedName::builder()
        .common_name("myca.local")
        .country(vec!["FR".to_string()])
        .organization(vec!["Acme".to_string()])
        .organizational_unit(vec!["Infra".to_string(), "PKI".to_string()])
        .build()
}

pub fn ca_config(out: &Path, name: &str) -> CertificateConfig {
    CertificateConfig::builder()
        .name(name)
        .subject(ca_subject())
        .out(out)
        .build()
}

/// Issues a self-signed root CA with an unencrypted key.
pub fn generate_ca(out: &Path, name: &str) -> CertifiedFiles {
    issue_ca(&ca_config(out, name)).unwrap()
}

pub fn leaf_config(out: &Path, name: &str, ca: &CertifiedFiles) -> CertificateConfig {
    CertificateConfig::builder()
        .name(name)
        .subject(
            DistinguishedName::builder()
                .common_name("server.myca.local")
                .build(),
        )
        .auth_server(true)
        .out(out)
        .signing_cert(ca.certificate.clone())
        .signing_key(ca.key.clone())
        .build()
}

pub fn csr_config(out: &Path, name: &str) -> CsrConfig {
    CsrConfig::builder()
        .name(name)
        .subject(
            DistinguishedName::builder()
                .common_name("client.myca.local")
                .build(),
        )
        .out(out)
        .build()
}

pub fn read_cert(path: &Path) -> Certificate {
    Certificate::from_pem(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn read_request(path: &Path) -> CertificateRequest {
    CertificateRequest::from_pem(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn read_key(path: &Path, password: Option<&str>) -> KeyPair {
    KeyPair::from_pem(&std::fs::read_to_string(path).unwrap(), password).unwrap()
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
