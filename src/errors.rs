// src/errors.rs

use std::result;

use thiserror::Error;

/// Convenient alias for results throughout Portcullis.
pub type LicenseResult<T> = result::Result<T, LicenseError>;

/// Central error type for license-related operations.
///
/// The engine collapses most of these to a boolean plus status flags before
/// they reach the host; the variants exist so logs and internal call sites
/// can tell the failure modes apart.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The server responded, but with a status outside the success range.
    /// A status of 0 means the transport never produced a response.
    #[error("transport error: status {status}")]
    Transport { status: u16 },

    /// Network / HTTP client errors when talking to the licensing server.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The token is not a well-formed compact JWT, or a claim is missing
    /// or of the wrong type.
    #[error("token decode failed: {0}")]
    DecodePayload(String),

    /// Cryptographic signature verification failed.
    #[error("token signature rejected")]
    BadSignature,

    /// Fewer than two of the three fingerprint components match.
    #[error("device fingerprint mismatch")]
    FingerprintMismatch,

    /// The token was issued for a different product.
    #[error("license is for product {found:?}, expected {expected:?}")]
    WrongProduct { expected: String, found: String },

    /// A trial license whose expiration has passed.
    #[error("trial expired")]
    Expired,

    /// Online revalidation failed and the grace period is exhausted.
    #[error("validation grace period exceeded")]
    StaleOffline,

    /// Local storage errors (filesystem, OS I/O, etc.).
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}
