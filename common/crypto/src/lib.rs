//! Minimal primitives for signing session tokens: a URL-safe base64 codec and
//! HMAC-SHA256 over a process-wide secret. Nothing here depends on a JWT
//! library so it can back the restricted token engine.

pub mod base64url;
pub mod signer;

use thiserror::Error;

pub use signer::{sign, verify, SigningSecret, SIGNATURE_LENGTH};

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signing secret is empty")]
    EmptySecret,
    #[error("malformed base64url input: {0}")]
    MalformedEncoding(String),
}
