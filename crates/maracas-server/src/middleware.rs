use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use maracas_core::access::{self, AdminAccess, DenyReason, RoleLookupFailed};

use crate::api::AppState;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The admin identity resolved by [`require_admin`], stored as a request
/// extension for handlers that need the acting user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub maracas_db::SessionIdentity);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter protecting the auth and admin surfaces.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct GuardErrorBody {
    error: GuardError,
}

#[derive(Debug, Serialize)]
struct GuardError {
    code: &'static str,
    message: &'static str,
}

fn guard_response(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(GuardErrorBody {
            error: GuardError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return guard_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

/// Middleware gating the admin API.
///
/// Resolves the bearer token to a session, checks the admin role
/// assignment, and classifies the visitor with
/// [`access::evaluate_admin_access`]. The check runs fresh on every request;
/// admin status is never cached across requests. Handlers behind this
/// middleware can read the acting identity from the [`CurrentUser`]
/// extension.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = match bearer_token(req.headers()) {
        None => None,
        Some(token) => match maracas_db::get_session(&state.pool, token).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                return guard_response(
                    StatusCode::FORBIDDEN,
                    "forbidden",
                    "error verifying administrator access",
                );
            }
        },
    };

    let Some(identity) = session else {
        return guard_response(StatusCode::UNAUTHORIZED, "unauthorized", "sign in required");
    };

    let has_role = maracas_db::has_role(&state.pool, identity.user_id, maracas_core::ADMIN_ROLE)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %identity.user_id, "admin role lookup failed");
            RoleLookupFailed
        });

    match access::evaluate_admin_access(Some(identity.user_id), has_role) {
        AdminAccess::Authorized => {
            req.extensions_mut().insert(CurrentUser(identity));
            next.run(req).await
        }
        AdminAccess::Forbidden(DenyReason::MissingRole) => guard_response(
            StatusCode::FORBIDDEN,
            "forbidden",
            "administrator privileges required",
        ),
        AdminAccess::Forbidden(DenyReason::LookupFailed) => guard_response(
            StatusCode::FORBIDDEN,
            "forbidden",
            "error verifying administrator access",
        ),
        AdminAccess::Unauthenticated => {
            guard_response(StatusCode::UNAUTHORIZED, "unauthorized", "sign in required")
        }
    }
}

/// Pulls the bearer token out of an `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
