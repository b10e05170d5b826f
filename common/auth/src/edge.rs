use std::num::NonZeroU32;
use std::sync::Arc;

use common_crypto::SigningSecret;

use crate::claims::{Claims, Principal};
use crate::clock::{Clock, SystemClock};
use crate::codec::{self, DEFAULT_LIFETIME};
use crate::error::{AuthResult, TokenError};
use crate::service::{TokenEngine, TokenService};

/// Token engine for restricted runtimes: only the base64url codec and
/// HMAC-SHA256 from common-crypto, no JWT library.
#[derive(Clone)]
pub struct EdgeTokenService {
    secret: SigningSecret,
    lifetime: NonZeroU32,
    clock: Arc<dyn Clock>,
}

impl EdgeTokenService {
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            lifetime: DEFAULT_LIFETIME,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_lifetime(mut self, lifetime: NonZeroU32) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl TokenService for EdgeTokenService {
    fn engine(&self) -> TokenEngine {
        TokenEngine::Edge
    }

    fn issue(&self, principal: &Principal) -> AuthResult<String> {
        let claims = Claims::for_principal(principal, self.clock.now(), self.lifetime);
        codec::encode(&claims, &self.secret)
    }

    fn verify_detailed(&self, token: &str) -> Result<Claims, TokenError> {
        codec::parse(token, &self.secret, self.clock.now())
    }
}
