// src/kubeconfig/certificate.rs
use std::io;

use chrono::{DateTime, TimeZone, Utc};
use x509_parser::pem::parse_x509_pem;

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub not_after: DateTime<Utc>,
}

/// Subject, issuer and expiry of the first certificate in a PEM bundle.
pub fn summarize(pem: &str) -> io::Result<CertificateSummary> {
    let (_, pem) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let not_after = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Invalid not_after timestamp"))?;

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_after,
    })
}
