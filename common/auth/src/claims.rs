use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Credential-lookup result handed to the issuer. Trusted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }
}

/// Token payload. Field order is part of the wire format: both token engines
/// serialize it through serde, so the declaration order below is the order
/// of keys in the encoded claims segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub subject_id: String,
    pub email: String,
    pub role: Role,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Claims {
    pub fn for_principal(principal: &Principal, issued_at: i64, lifetime: NonZeroU32) -> Self {
        Self {
            subject_id: principal.id.clone(),
            email: principal.email.clone(),
            role: principal.role,
            issued_at,
            expires_at: issued_at + i64::from(lifetime.get()),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// A token stays valid through the second named by `expiresAt`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.subject_id.clone(), self.email.clone(), self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifetime() -> NonZeroU32 {
        NonZeroU32::new(604_800).expect("non-zero")
    }

    #[test]
    fn serializes_in_wire_order() {
        let principal = Principal::new("u1", "a@b.com", Role::Teacher);
        let claims = Claims::for_principal(&principal, 1_700_000_000, lifetime());
        let json = serde_json::to_string(&claims).expect("serialize");
        assert_eq!(
            json,
            r#"{"subjectId":"u1","email":"a@b.com","role":"TEACHER","issuedAt":1700000000,"expiresAt":1700604800}"#
        );
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let principal = Principal::new("u1", "a@b.com", Role::Student);
        let claims = Claims::for_principal(&principal, 100, lifetime());
        assert!(claims.expires_at > claims.issued_at);
        assert!(!claims.is_expired_at(100 + 604_800));
        assert!(claims.is_expired_at(100 + 604_801));
    }

    #[test]
    fn missing_field_is_rejected() {
        let json = r#"{"subjectId":"u1","email":"a@b.com","role":"ADMIN","issuedAt":1}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }

    #[test]
    fn principal_round_trips_through_claims() {
        let principal = Principal::new("u9", "t@school.org", Role::Admin);
        let claims = Claims::for_principal(&principal, 0, lifetime());
        assert_eq!(claims.principal(), principal);
        assert!(claims.has_role(Role::Admin));
        assert!(!claims.has_role(Role::Teacher));
    }
}
