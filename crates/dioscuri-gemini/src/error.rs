//! Gemini error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Request is {0} bytes, limit is 1024")]
    RequestTooLong(usize),

    #[error("Malformed response header: {0}")]
    MalformedHeader(String),

    #[error("Response body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Timed out {0}")]
    Timeout(&'static str),

    #[error("Certificate not trusted: {0}")]
    Untrusted(#[from] TrustError),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] dioscuri_storage::StorageError),
}

/// Why a presented certificate was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("certificate could not be parsed")]
    InvalidCertificate,

    #[error("certificate is outside its validity period")]
    Expired,

    #[error("public key for {0} differs from the pinned key")]
    KeyMismatch(String),
}
