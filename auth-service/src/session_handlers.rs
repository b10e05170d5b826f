use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_auth::{credential_from_headers, AuthContext, AuthError, Claims, Role};
use common_security::GateDecision;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::AppState;

pub const FORWARDED_URI_HEADER: &str = "x-forwarded-uri";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const ROLES_HEADER: &str = "x-roles";

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct SessionError {
    status: StatusCode,
    body: ErrorResponse,
}

impl SessionError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code,
                message: message.into(),
            },
        }
    }

    fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid credentials. Please try again.",
        )
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    fn internal_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "SERVER_ERROR",
            "Unable to complete the request.",
        )
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AuthError> for SessionError {
    fn from(err: AuthError) -> Self {
        error!(error = %err, "token operation failed");
        Self::internal_error()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl From<&Claims> for SessionUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.subject_id.clone(),
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: SessionUser,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user: SessionUser,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// `POST /session`: check credentials, issue a token and set the cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, SessionError> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        state.record_login_metric("invalid_request");
        return Err(SessionError::validation("Email and password are required."));
    }

    let principal = match state.directory.authenticate(email, &payload.password).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            state.record_login_metric("invalid_credentials");
            warn!(%email, "login rejected");
            return Err(SessionError::invalid_credentials());
        }
        Err(err) => {
            state.record_login_metric("error");
            error!(?err, %email, "principal directory lookup failed");
            return Err(SessionError::internal_error());
        }
    };

    let token = state.tokens.issue(&principal).inspect_err(|_| {
        state.record_login_metric("error");
    })?;
    let claims = state.tokens.verify_detailed(&token).map_err(|err| {
        state.record_login_metric("error");
        error!(error = %err, "freshly issued token failed verification");
        SessionError::internal_error()
    })?;

    state.record_login_metric("success");
    info!(subject_id = %claims.subject_id, role = %claims.role, engine = %state.tokens.engine(), "session issued");

    let cookie = HeaderValue::from_str(&state.cookie.session_header(&token))
        .map_err(|_| SessionError::internal_error())?;
    let body = LoginResponse {
        expires_at: claims.expires_at,
        user: SessionUser::from(&claims),
        token,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// `DELETE /session`: drop the cookie. Tokens are stateless, so a copy held
/// elsewhere stays valid until it expires.
pub async fn logout(State(state): State<AppState>) -> Result<Response, SessionError> {
    let cookie = HeaderValue::from_str(&state.cookie.clear_header())
        .map_err(|_| SessionError::internal_error())?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response())
}

/// `GET /session`, behind the role gate.
pub async fn whoami(ctx: AuthContext) -> Json<SessionView> {
    let claims = ctx.into_claims();
    Json(SessionView {
        user: SessionUser::from(&claims),
        issued_at: claims.issued_at,
        expires_at: claims.expires_at,
    })
}

/// `GET /authorize`: forward-auth check for a reverse proxy. The original
/// path comes from `X-Forwarded-Uri`; on allow the identity is returned in
/// headers for the proxy to pass upstream.
pub async fn forward_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, SessionError> {
    let path = forwarded_path(&headers);
    let credential = credential_from_headers(&headers, &state.cookie.name);
    let decision = state.gate.check(&path, credential.as_deref());
    state.record_gate_metric(decision.outcome());

    match decision {
        GateDecision::Allowed { claims } => {
            let mut response = StatusCode::OK.into_response();
            let out = response.headers_mut();
            out.insert(HeaderName::from_static(USER_ID_HEADER), header_value(&claims.subject_id)?);
            out.insert(HeaderName::from_static(USER_EMAIL_HEADER), header_value(&claims.email)?);
            out.insert(
                HeaderName::from_static(ROLES_HEADER),
                HeaderValue::from_static(claims.role.as_str()),
            );
            Ok(response)
        }
        GateDecision::Denied { status, reason } => {
            warn!(%path, status = status.as_u16(), %reason, "forward-auth denied");
            Ok(reason.into_response())
        }
    }
}

fn forwarded_path(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_URI_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|uri| uri.split(['?', '#']).next().unwrap_or_default().trim())
        .filter(|path| !path.is_empty())
        .unwrap_or("/")
        .to_string()
}

fn header_value(value: &str) -> Result<HeaderValue, SessionError> {
    HeaderValue::from_str(value).map_err(|_| {
        error!("identity value is not a valid header");
        SessionError::internal_error()
    })
}
