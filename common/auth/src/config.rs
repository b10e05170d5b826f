use std::env;
use std::num::NonZeroU32;

use common_crypto::SigningSecret;

use crate::codec::DEFAULT_LIFETIME;
use crate::error::{AuthError, AuthResult};
use crate::extractors::DEFAULT_COOKIE_NAME;
use crate::service::TokenEngine;

pub const SECRET_VAR: &str = "AUTH_TOKEN_SECRET";
pub const LIFETIME_VAR: &str = "AUTH_TOKEN_LIFETIME_SECONDS";
pub const ENGINE_VAR: &str = "AUTH_TOKEN_ENGINE";
pub const COOKIE_NAME_VAR: &str = "AUTH_COOKIE_NAME";

/// Process-wide token settings, loaded once at start-up and read-only after.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: SigningSecret,
    /// Seconds between `issuedAt` and `expiresAt`.
    pub lifetime: NonZeroU32,
    pub engine: TokenEngine,
    /// Name of the cookie carrying the token.
    pub cookie_name: String,
}

impl TokenConfig {
    /// Defaults: 7 day lifetime, standard engine, `token` cookie.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            lifetime: DEFAULT_LIFETIME,
            engine: TokenEngine::default(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: NonZeroU32) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_engine(mut self, engine: TokenEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Load from the process environment. A missing or empty secret is fatal.
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_secret = lookup(SECRET_VAR)
            .ok_or_else(|| AuthError::Configuration(format!("{SECRET_VAR} must be set")))?;
        let secret = SigningSecret::new(raw_secret)
            .map_err(|err| AuthError::Configuration(format!("{SECRET_VAR}: {err}")))?;

        let mut config = Self::new(secret);

        if let Some(value) = lookup(LIFETIME_VAR).and_then(|v| normalize_optional(&v)) {
            config.lifetime = parse_lifetime(&value)?;
        }
        if let Some(value) = lookup(ENGINE_VAR).and_then(|v| normalize_optional(&v)) {
            config.engine = value.parse()?;
        }
        if let Some(value) = lookup(COOKIE_NAME_VAR).and_then(|v| normalize_optional(&v)) {
            config.cookie_name = value;
        }

        Ok(config)
    }
}

fn parse_lifetime(value: &str) -> AuthResult<NonZeroU32> {
    value
        .parse::<NonZeroU32>()
        .map_err(|err| AuthError::Configuration(format!("{LIFETIME_VAR} '{value}': {err}")))
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
