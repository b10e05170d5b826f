use std::sync::Arc;

use common_auth::{
    EdgeTokenService, FixedClock, JwtTokenService, Principal, Role, TokenError, TokenService,
};
use common_crypto::{base64url, SigningSecret};
use proptest::prelude::*;

const BASE64URL_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

fn pair(secret: &str, now: i64) -> (JwtTokenService, EdgeTokenService) {
    let secret = SigningSecret::new(secret).expect("secret");
    let clock = Arc::new(FixedClock::at(now));
    (
        JwtTokenService::new(&secret).with_clock(clock.clone()),
        EdgeTokenService::new(secret).with_clock(clock),
    )
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Student), Just(Role::Teacher), Just(Role::Admin)]
}

fn principal_strategy() -> impl Strategy<Value = Principal> {
    (
        "[a-zA-Z0-9-]{1,36}",
        "[a-z0-9._]{1,16}@[a-z0-9]{1,12}\\.[a-z]{2,4}",
        role_strategy(),
    )
        .prop_map(|(id, email, role)| Principal::new(id, email, role))
}

#[test]
fn standard_tokens_verify_at_the_edge() {
    let (standard, edge) = pair("shared-secret", 1_700_000_000);
    let principal = Principal::new("u1", "a@b.com", Role::Admin);

    let token = standard.issue(&principal).expect("issue");
    let claims = edge.verify(&token).expect("edge verifies standard token");
    assert_eq!(claims.principal(), principal);
}

#[test]
fn edge_tokens_verify_in_standard() {
    let (standard, edge) = pair("shared-secret", 1_700_000_000);
    let principal = Principal::new("u2", "t@school.org", Role::Teacher);

    let token = edge.issue(&principal).expect("issue");
    let claims = standard.verify(&token).expect("standard verifies edge token");
    assert_eq!(claims.principal(), principal);
}

#[test]
fn wrong_segment_counts_are_malformed_everywhere() {
    let (standard, edge) = pair("shared-secret", 0);
    let services: [&dyn TokenService; 2] = [&standard, &edge];

    for token in ["", "abc", "a.b", "a.b.c.d", "....", "a..b.c"] {
        for service in services {
            assert!(
                matches!(service.verify_detailed(token), Err(TokenError::Malformed(_))),
                "{token:?} via {}",
                service.engine()
            );
        }
    }
}

#[test]
fn garbage_signature_segment_is_rejected() {
    let (standard, edge) = pair("shared-secret", 0);
    let token = edge
        .issue(&Principal::new("u1", "a@b.com", Role::Student))
        .expect("issue");
    let (signing_input, _) = token.rsplit_once('.').expect("three segments");
    let forged = format!("{signing_input}.not*base64");

    for service in [&standard as &dyn TokenService, &edge] {
        assert!(service.verify_detailed(&forged).is_err());
        assert!(service.verify(&forged).is_err());
    }
}

#[test]
fn both_engines_emit_alg_first_header() {
    let (standard, edge) = pair("shared-secret", 1_700_000_000);
    let principal = Principal::new("u1", "a@b.com", Role::Teacher);

    for service in [&standard as &dyn TokenService, &edge] {
        let token = service.issue(&principal).expect("issue");
        let header = token.split('.').next().expect("header segment");
        assert_eq!(header, "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
        assert_eq!(
            base64url::decode(header).expect("base64url"),
            br#"{"alg":"HS256","typ":"JWT"}"#
        );
    }
}

#[test]
fn forged_garbage_header_fails_on_signature_first() {
    let (standard, edge) = pair("shared-secret", 0);
    let forged = format!(
        "{}.{}.{}",
        base64url::encode("not json"),
        base64url::encode("{}"),
        base64url::encode([0u8; 32])
    );

    for service in [&standard as &dyn TokenService, &edge] {
        assert_eq!(
            service.verify_detailed(&forged),
            Err(TokenError::InvalidSignature),
            "{}",
            service.engine()
        );
    }
}

#[test]
fn correctly_signed_garbage_header_is_reported_alike() {
    let secret = SigningSecret::new("shared-secret").expect("secret");
    let (standard, edge) = pair("shared-secret", 0);
    let input = format!(
        "{}.{}",
        base64url::encode("not json"),
        base64url::encode(r#"{"subjectId":"u1","email":"a@b.com","role":"ADMIN","issuedAt":0,"expiresAt":10}"#)
    );
    let token = format!(
        "{input}.{}",
        base64url::encode(common_crypto::sign(&secret, input.as_bytes()))
    );

    for service in [&standard as &dyn TokenService, &edge] {
        assert!(
            matches!(service.verify_detailed(&token), Err(TokenError::MalformedEncoding(_))),
            "{}",
            service.engine()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_principal_round_trips_across_engines(principal in principal_strategy()) {
        let (standard, edge) = pair("property-secret", 1_650_000_000);

        let from_standard = standard.issue(&principal).expect("issue");
        let from_edge = edge.issue(&principal).expect("issue");
        prop_assert_eq!(&from_standard, &from_edge);

        prop_assert_eq!(edge.verify(&from_standard).expect("verify").principal(), principal.clone());
        prop_assert_eq!(standard.verify(&from_edge).expect("verify").principal(), principal);
    }

    #[test]
    fn tampered_claims_fail_signature_check(
        principal in principal_strategy(),
        position in any::<prop::sample::Index>(),
        replacement in prop::sample::select(BASE64URL_ALPHABET.to_vec()),
    ) {
        let (standard, edge) = pair("property-secret", 1_650_000_000);
        let token = edge.issue(&principal).expect("issue");

        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        let mut claims = parts[1].clone().into_bytes();
        let index = position.index(claims.len());
        prop_assume!(claims[index] != replacement);
        claims[index] = replacement;
        parts[1] = String::from_utf8(claims).expect("ascii");
        let tampered = parts.join(".");

        prop_assert_eq!(standard.verify_detailed(&tampered), Err(TokenError::InvalidSignature));
        prop_assert_eq!(edge.verify_detailed(&tampered), Err(TokenError::InvalidSignature));
    }
}
