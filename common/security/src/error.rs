use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Why the gate turned a request away. The messages are the only detail a
/// caller ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("authentication required")]
    MissingCredential,
    #[error("invalid token")]
    InvalidToken,
    #[error("insufficient permissions")]
    Forbidden,
}

impl Denial {
    pub fn status(&self) -> StatusCode {
        match self {
            Denial::MissingCredential | Denial::InvalidToken => StatusCode::UNAUTHORIZED,
            Denial::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Denial::MissingCredential => "AUTH_REQUIRED",
            Denial::InvalidToken => "AUTH_TOKEN",
            Denial::Forbidden => "FORBIDDEN",
        }
    }
}

#[derive(Debug, Serialize)]
struct DenialBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let body = DenialBody {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Problems in a textual route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("route rule '{0}' is missing '='")]
    MissingSeparator(String),
    #[error("route prefix '{0}' must start with '/'")]
    InvalidPrefix(String),
    #[error("unknown role '{role}' for route '{prefix}'")]
    UnknownRole { prefix: String, role: String },
}
