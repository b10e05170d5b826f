use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::claims::{Claims, Principal};
use crate::config::TokenConfig;
use crate::edge::EdgeTokenService;
use crate::error::{AuthError, AuthResult, TokenError};

/// Which implementation signs and verifies tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenEngine {
    /// Backed by the jsonwebtoken crate.
    #[default]
    Standard,
    /// Hand-assembled from the base64url codec and HMAC primitives only.
    Edge,
}

impl TokenEngine {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TokenEngine::Standard => "standard",
            TokenEngine::Edge => "edge",
        }
    }
}

impl fmt::Display for TokenEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenEngine {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(TokenEngine::Standard),
            "edge" => Ok(TokenEngine::Edge),
            other => Err(AuthError::Configuration(format!(
                "unsupported token engine '{other}'. Use standard or edge."
            ))),
        }
    }
}

/// Issue and verify session tokens.
///
/// Every implementation must follow the format in [`crate::codec`]: a token
/// issued by one engine verifies under any other given the same secret.
pub trait TokenService: Send + Sync {
    fn engine(&self) -> TokenEngine;

    fn issue(&self, principal: &Principal) -> AuthResult<String>;

    /// Full verification that keeps the reason for a rejection. For
    /// diagnostics and tests; never surface the error to the credential
    /// holder.
    fn verify_detailed(&self, token: &str) -> Result<Claims, TokenError>;

    fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.verify_detailed(token).map_err(|err| {
            debug!(engine = %self.engine(), kind = err.kind(), error = %err, "token rejected");
            AuthError::InvalidToken
        })
    }
}

/// Build the configured engine. A missing engine is a configuration error.
pub fn build_token_service(config: &TokenConfig) -> AuthResult<Arc<dyn TokenService>> {
    match config.engine {
        TokenEngine::Edge => Ok(Arc::new(
            EdgeTokenService::new(config.secret.clone()).with_lifetime(config.lifetime),
        )),
        #[cfg(feature = "standard")]
        TokenEngine::Standard => Ok(Arc::new(
            crate::standard::JwtTokenService::new(&config.secret).with_lifetime(config.lifetime),
        )),
        #[cfg(not(feature = "standard"))]
        TokenEngine::Standard => Err(AuthError::Configuration(
            "standard token engine not compiled in; enable the `standard` feature".to_string(),
        )),
    }
}
