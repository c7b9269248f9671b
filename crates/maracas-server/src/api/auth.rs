//! Email/password authentication endpoints.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maracas_db::AuthError;

use crate::middleware::{bearer_token, RequestId};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub(super) struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SessionResponse {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub(super) struct IdentityView {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SignOutResponse {
    pub signed_out: bool,
}

fn validate_credentials(request_id: &str, body: &CredentialsRequest) -> Result<(), ApiError> {
    if !maracas_core::checkout::plausible_email(body.email.trim()) {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "email address looks malformed",
        ));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn map_auth_error(request_id: &str, error: AuthError) -> ApiError {
    match error {
        AuthError::EmailTaken => ApiError::new(request_id, "conflict", error.to_string()),
        AuthError::InvalidCredentials => {
            ApiError::new(request_id, "unauthorized", error.to_string())
        }
        AuthError::Hash(e) => {
            tracing::error!(error = %e, "password hashing failed");
            ApiError::new(request_id, "internal_error", "failed to process credentials")
        }
        AuthError::Db(e) => map_db_error(request_id.to_owned(), &e),
    }
}

pub(super) async fn sign_up(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let rid = &req_id.0;
    validate_credentials(rid, &body)?;

    let (user, token) = maracas_db::sign_up(
        &state.pool,
        &body.email,
        &body.password,
        state.session_ttl_hours,
    )
    .await
    .map_err(|e| map_auth_error(rid, e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: SessionResponse {
                token,
                user_id: user.id,
                email: user.email,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn sign_in(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let rid = &req_id.0;

    let (user, token) = maracas_db::sign_in(
        &state.pool,
        &body.email,
        &body.password,
        state.session_ttl_hours,
    )
    .await
    .map_err(|e| map_auth_error(rid, e))?;

    Ok(Json(ApiResponse {
        data: SessionResponse {
            token,
            user_id: user.id,
            email: user.email,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn sign_out(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SignOutResponse>>, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        maracas_db::sign_out(&state.pool, token)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    }

    Ok(Json(ApiResponse {
        data: SignOutResponse { signed_out: true },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Returns the identity behind the presented token, or `null` when there is
/// no valid session.
pub(super) async fn session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Option<IdentityView>>>, ApiError> {
    let identity = match bearer_token(&headers) {
        None => None,
        Some(token) => maracas_db::get_session(&state.pool, token)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?,
    };

    Ok(Json(ApiResponse {
        data: identity.map(|s| IdentityView {
            user_id: s.user_id,
            email: s.email,
        }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
