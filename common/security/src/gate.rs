use std::sync::Arc;

use axum::http::StatusCode;
use common_auth::{Claims, Role, TokenService};
use tracing::debug;

use crate::error::Denial;
use crate::policy::RoutePolicy;

/// Outcome of a gate check. Every check ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed { claims: Claims },
    Denied { status: StatusCode, reason: Denial },
}

impl GateDecision {
    pub fn deny(reason: Denial) -> Self {
        GateDecision::Denied {
            status: reason.status(),
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed { .. })
    }

    /// Metric label for the decision.
    pub fn outcome(&self) -> &'static str {
        match self {
            GateDecision::Allowed { .. } => "allowed",
            GateDecision::Denied {
                reason: Denial::MissingCredential,
                ..
            } => "unauthenticated",
            GateDecision::Denied {
                reason: Denial::InvalidToken,
                ..
            } => "invalid_token",
            GateDecision::Denied {
                reason: Denial::Forbidden,
                ..
            } => "forbidden",
        }
    }
}

/// Decide one request. `None` means no rule covers the path, so any caller
/// holding a valid token passes. `Some(roles)` admits only those roles; an
/// empty list admits nobody.
pub fn authorize(
    service: &dyn TokenService,
    credential: Option<&str>,
    allowed: Option<&[Role]>,
) -> GateDecision {
    let Some(token) = credential.map(str::trim).filter(|t| !t.is_empty()) else {
        return GateDecision::deny(Denial::MissingCredential);
    };

    let claims = match service.verify(token) {
        Ok(claims) => claims,
        Err(_) => return GateDecision::deny(Denial::InvalidToken),
    };

    if let Some(roles) = allowed.filter(|roles| !roles.contains(&claims.role)) {
        debug!(subject_id = %claims.subject_id, role = %claims.role, allowed = ?roles, "role not permitted");
        return GateDecision::deny(Denial::Forbidden);
    }

    GateDecision::Allowed { claims }
}

/// Token verification plus route policy, shared across requests.
#[derive(Clone)]
pub struct RoleGate {
    service: Arc<dyn TokenService>,
    policy: Arc<RoutePolicy>,
}

impl RoleGate {
    pub fn new(service: Arc<dyn TokenService>, policy: Arc<RoutePolicy>) -> Self {
        Self { service, policy }
    }

    pub fn check(&self, path: &str, credential: Option<&str>) -> GateDecision {
        authorize(
            self.service.as_ref(),
            credential,
            self.policy.allowed_roles(path),
        )
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn service(&self) -> &Arc<dyn TokenService> {
        &self.service
    }
}
