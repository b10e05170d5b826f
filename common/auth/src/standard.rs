use std::num::NonZeroU32;
use std::sync::Arc;

use common_crypto::SigningSecret;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{crypto, decode, Algorithm, DecodingKey, EncodingKey, Validation};

use crate::claims::{Claims, Principal};
use crate::clock::{Clock, SystemClock};
use crate::codec::{self, DEFAULT_LIFETIME};
use crate::error::{AuthError, AuthResult, TokenError};
use crate::service::{TokenEngine, TokenService};

/// Token engine backed by the jsonwebtoken crate.
#[derive(Clone)]
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: NonZeroU32,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    pub fn new(secret: &SigningSecret) -> Self {
        // Expiry lives in `expiresAt`, not the registered `exp` claim, and is
        // checked against the injected clock after decoding.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.expose()),
            decoding: DecodingKey::from_secret(secret.expose()),
            validation,
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

impl TokenService for JwtTokenService {
    fn engine(&self) -> TokenEngine {
        TokenEngine::Standard
    }

    fn issue(&self, principal: &Principal) -> AuthResult<String> {
        let claims = Claims::for_principal(principal, self.clock.now(), self.lifetime);
        // The library's own header serializes `typ` first; reuse the codec's
        // segments so the bytes match the edge engine.
        let signing_input = codec::signing_input(&claims)?;
        let signature = crypto::sign(signing_input.as_bytes(), &self.encoding, Algorithm::HS256)
            .map_err(|err| AuthError::Signing(err.to_string()))?;
        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify_detailed(&self, token: &str) -> Result<Claims, TokenError> {
        // The library splits from the right and would misreport extra dots.
        let segments = codec::split_segments(token)?;

        // `decode` parses the header before checking the signature; nothing
        // from the token is read until the signature holds.
        let signature_ok = crypto::verify(
            segments.signature,
            segments.signing_input.as_bytes(),
            &self.decoding,
            Algorithm::HS256,
        )
        .unwrap_or(false);
        if !signature_ok {
            return Err(TokenError::InvalidSignature);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|err| map_jwt_error(&err))?;
        codec::check_expiry(&data.claims, self.clock.now())?;
        Ok(data.claims)
    }
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::MalformedEncoding(err.to_string())
        }
        _ => TokenError::Malformed(err.to_string()),
    }
}
