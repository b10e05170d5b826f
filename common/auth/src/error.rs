use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_crypto::CryptoError;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Reasons a token failed verification.
///
/// These stay inside the token service and its logs. Callers only ever see
/// [`AuthError::InvalidToken`], so a probing client cannot tell an expired
/// token from a forged or corrupted one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("malformed token encoding: {0}")]
    MalformedEncoding(String),
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },
}

impl TokenError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed(_) => "malformed",
            TokenError::MalformedEncoding(_) => "malformed_encoding",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired { .. } => "expired",
        }
    }
}

impl From<CryptoError> for TokenError {
    fn from(value: CryptoError) -> Self {
        Self::MalformedEncoding(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid auth configuration: {0}")]
    Configuration(String),
    #[error("invalid token")]
    InvalidToken,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("authentication required")]
    MissingCredential,
}

impl From<CryptoError> for AuthError {
    fn from(value: CryptoError) -> Self {
        Self::Configuration(value.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::MissingCredential => {
                (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", self.to_string())
            }
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN", self.to_string()),
            AuthError::Configuration(_) | AuthError::Signing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL",
                "internal authentication error".to_string(),
            ),
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
