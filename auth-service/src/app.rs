use std::sync::Arc;

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use common_auth::TokenService;
use common_security::{enforce, GateLayerState, RoleGate, RoutePolicy};
use tracing::error;

use crate::config::CookieSettings;
use crate::directory::PrincipalDirectory;
use crate::metrics::AuthMetrics;
use crate::session_handlers::{forward_auth, login, logout, whoami};

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<dyn TokenService>,
    pub gate: RoleGate,
    pub directory: Arc<dyn PrincipalDirectory>,
    pub cookie: Arc<CookieSettings>,
    pub metrics: Arc<AuthMetrics>,
}

impl AppState {
    pub fn new(
        tokens: Arc<dyn TokenService>,
        policy: RoutePolicy,
        directory: Arc<dyn PrincipalDirectory>,
        cookie: CookieSettings,
        metrics: Arc<AuthMetrics>,
    ) -> Self {
        let gate = RoleGate::new(tokens.clone(), Arc::new(policy));
        Self {
            tokens,
            gate,
            directory,
            cookie: Arc::new(cookie),
            metrics,
        }
    }

    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }

    pub fn record_gate_metric(&self, outcome: &str) {
        self.metrics.gate_decision(outcome);
    }
}

impl FromRef<AppState> for Arc<dyn TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for Arc<CookieSettings> {
    fn from_ref(state: &AppState) -> Self {
        state.cookie.clone()
    }
}

impl FromRef<AppState> for Arc<AuthMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(metrics): State<Arc<AuthMetrics>>) -> Response {
    match metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(?err, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Public routes plus `GET /session`, which sits behind the role gate.
pub fn build_router(state: AppState) -> Router {
    let gate_state =
        GateLayerState::new(state.gate.clone()).with_cookie_name(&state.cookie.name);

    let protected: Router<AppState> = Router::new()
        .route("/session", get(whoami))
        .route_layer(from_fn_with_state(gate_state, enforce));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/session", post(login).delete(logout))
        .route("/authorize", get(forward_auth))
        .merge(protected)
        .with_state(state)
}
