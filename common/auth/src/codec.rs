//! Compact token format shared by both token engines.
//!
//! ```text
//! b64url({"alg":"HS256","typ":"JWT"}) . b64url(claims) . b64url(HMAC-SHA256(secret, p1 "." p2))
//! ```
//!
//! Existing consumers compare these bytes, so the header key order is fixed
//! here and both engines build their signing input with [`signing_input`].

use std::num::NonZeroU32;

use common_crypto::{base64url, signer, SigningSecret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult, TokenError};

pub const ALGORITHM: &str = "HS256";
pub const TOKEN_TYPE: &str = "JWT";
pub const SEGMENT_COUNT: usize = 3;

pub const DEFAULT_LIFETIME_SECONDS: u32 = 7 * 24 * 60 * 60;
pub const DEFAULT_LIFETIME: NonZeroU32 = match NonZeroU32::new(DEFAULT_LIFETIME_SECONDS) {
    Some(lifetime) => lifetime,
    None => panic!("default token lifetime must be non-zero"),
};

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
        }
    }
}

/// The three dot-separated parts of a token, borrowed from the original
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segments<'a> {
    pub header: &'a str,
    pub claims: &'a str,
    pub signature: &'a str,
    /// `header.claims`, exactly as transmitted; the signature covers these bytes.
    pub signing_input: &'a str,
}

/// Structural check: a token has exactly three segments.
pub fn split_segments(token: &str) -> Result<Segments<'_>, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != SEGMENT_COUNT {
        return Err(TokenError::Malformed(format!(
            "expected {SEGMENT_COUNT} segments, found {}",
            parts.len()
        )));
    }

    let signing_len = parts[0].len() + 1 + parts[1].len();
    Ok(Segments {
        header: parts[0],
        claims: parts[1],
        signature: parts[2],
        signing_input: &token[..signing_len],
    })
}

/// `header.claims`: the first two segments, which the signature covers.
pub fn signing_input(claims: &Claims) -> AuthResult<String> {
    let header = encode_part(&Header::hs256())?;
    let payload = encode_part(claims)?;
    Ok(format!("{header}.{payload}"))
}

/// Assemble and sign a token for already-built claims.
pub fn encode(claims: &Claims, secret: &SigningSecret) -> AuthResult<String> {
    let signing_input = signing_input(claims)?;
    let signature = signer::sign(secret, signing_input.as_bytes());
    Ok(format!("{signing_input}.{}", base64url::encode(signature)))
}

/// Verify and decode a token.
///
/// Checks run in a fixed order: segment count, signature, header, claims,
/// expiry. Nothing decoded from the token is trusted before the signature
/// has been verified.
pub fn parse(token: &str, secret: &SigningSecret, now: i64) -> Result<Claims, TokenError> {
    let segments = split_segments(token)?;

    let signature =
        base64url::decode(segments.signature).map_err(|_| TokenError::InvalidSignature)?;
    if !signer::verify(secret, segments.signing_input.as_bytes(), &signature) {
        return Err(TokenError::InvalidSignature);
    }

    let header: Header = decode_part(segments.header)?;
    if header.alg != ALGORITHM {
        return Err(TokenError::Malformed(format!(
            "unsupported algorithm '{}'",
            header.alg
        )));
    }

    let claims: Claims = decode_part(segments.claims)?;
    check_expiry(&claims, now)?;
    Ok(claims)
}

pub fn check_expiry(claims: &Claims, now: i64) -> Result<(), TokenError> {
    if claims.is_expired_at(now) {
        return Err(TokenError::Expired {
            expires_at: claims.expires_at,
            now,
        });
    }
    Ok(())
}

fn encode_part<T: Serialize>(value: &T) -> AuthResult<String> {
    let json = serde_json::to_vec(value).map_err(|err| AuthError::Signing(err.to_string()))?;
    Ok(base64url::encode(json))
}

fn decode_part<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = base64url::decode(segment)?;
    serde_json::from_slice(&bytes).map_err(|err| TokenError::MalformedEncoding(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Principal;
    use crate::roles::Role;

    fn secret() -> SigningSecret {
        SigningSecret::new("test-secret").expect("secret")
    }

    fn teacher_claims(issued_at: i64) -> Claims {
        let principal = Principal::new("u1", "a@b.com", Role::Teacher);
        Claims::for_principal(&principal, issued_at, DEFAULT_LIFETIME)
    }

    fn sign_raw(header_json: &str, claims_json: &str) -> String {
        let input = format!(
            "{}.{}",
            base64url::encode(header_json),
            base64url::encode(claims_json)
        );
        let signature = signer::sign(&secret(), input.as_bytes());
        format!("{input}.{}", base64url::encode(signature))
    }

    #[test]
    fn header_segment_is_fixed() {
        let token = encode(&teacher_claims(0), &secret()).expect("encode");
        assert!(token.starts_with("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9."));

        let header = base64url::decode(token.split('.').next().expect("segment")).expect("b64");
        assert_eq!(header, br#"{"alg":"HS256","typ":"JWT"}"#);
    }

    #[test]
    fn encode_then_parse_round_trip() {
        let claims = teacher_claims(1_700_000_000);
        let token = encode(&claims, &secret()).expect("encode");
        let parsed = parse(&token, &secret(), 1_700_000_001).expect("parse");
        assert_eq!(parsed, claims);
    }

    #[test]
    fn segment_count_is_checked_first() {
        for token in ["", "a", "a.b", "a.b.c.d", "..."] {
            let err = parse(token, &secret(), 0).expect_err("must fail");
            assert!(matches!(err, TokenError::Malformed(_)), "{token}: {err:?}");
        }
    }

    #[test]
    fn signature_is_checked_before_claims_are_decoded() {
        // Claims segment is garbage, but the signature is wrong too: the
        // signature failure must win.
        let err = parse("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.!!!.AAAA", &secret(), 0)
            .expect_err("must fail");
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn undecodable_signature_is_a_signature_failure() {
        let token = encode(&teacher_claims(0), &secret()).expect("encode");
        let (input, _) = token.rsplit_once('.').expect("three segments");
        let err = parse(&format!("{input}.***"), &secret(), 0).expect_err("must fail");
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn correctly_signed_garbage_is_malformed_encoding() {
        let token = sign_raw(r#"{"alg":"HS256","typ":"JWT"}"#, "not json");
        let err = parse(&token, &secret(), 0).expect_err("must fail");
        assert!(matches!(err, TokenError::MalformedEncoding(_)));
    }

    #[test]
    fn correctly_signed_unknown_role_is_rejected() {
        let token = sign_raw(
            r#"{"alg":"HS256","typ":"JWT"}"#,
            r#"{"subjectId":"u1","email":"a@b.com","role":"ROOT","issuedAt":0,"expiresAt":10}"#,
        );
        let err = parse(&token, &secret(), 0).expect_err("must fail");
        assert!(matches!(err, TokenError::MalformedEncoding(_)));
    }

    #[test]
    fn foreign_algorithm_header_is_rejected() {
        let token = sign_raw(
            r#"{"alg":"HS512","typ":"JWT"}"#,
            r#"{"subjectId":"u1","email":"a@b.com","role":"ADMIN","issuedAt":0,"expiresAt":10}"#,
        );
        let err = parse(&token, &secret(), 0).expect_err("must fail");
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn expiry_is_enforced_after_signature() {
        let claims = teacher_claims(1_000);
        let token = encode(&claims, &secret()).expect("encode");
        let err = parse(&token, &secret(), claims.expires_at + 1).expect_err("expired");
        assert_eq!(
            err,
            TokenError::Expired {
                expires_at: claims.expires_at,
                now: claims.expires_at + 1
            }
        );
        assert!(parse(&token, &secret(), claims.expires_at).is_ok());
    }

    #[test]
    fn split_exposes_signing_input() {
        let segments = split_segments("aa.bbb.c").expect("split");
        assert_eq!(segments.header, "aa");
        assert_eq!(segments.claims, "bbb");
        assert_eq!(segments.signature, "c");
        assert_eq!(segments.signing_input, "aa.bbb");
    }
}
