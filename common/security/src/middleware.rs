use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common_auth::{credential_from_headers, AuthContext, DEFAULT_COOKIE_NAME};
use tracing::warn;

use crate::gate::{GateDecision, RoleGate};

/// State for [`enforce`]: the gate and the cookie that carries the token.
#[derive(Clone)]
pub struct GateLayerState {
    pub gate: RoleGate,
    pub cookie_name: Arc<str>,
}

impl GateLayerState {
    pub fn new(gate: RoleGate) -> Self {
        Self {
            gate,
            cookie_name: Arc::from(DEFAULT_COOKIE_NAME),
        }
    }

    pub fn with_cookie_name(mut self, name: impl AsRef<str>) -> Self {
        self.cookie_name = Arc::from(name.as_ref());
        self
    }
}

/// Role gate middleware. Use with `axum::middleware::from_fn_with_state`.
///
/// On allow the verified identity is stored as an [`AuthContext`] extension
/// for handlers to extract.
pub async fn enforce(
    State(state): State<GateLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let credential = credential_from_headers(request.headers(), &state.cookie_name);

    match state.gate.check(&path, credential.as_deref()) {
        GateDecision::Allowed { claims } => {
            request.extensions_mut().insert(AuthContext::new(claims));
            next.run(request).await
        }
        GateDecision::Denied { status, reason } => {
            warn!(%path, status = status.as_u16(), %reason, "request denied by role gate");
            reason.into_response()
        }
    }
}
