//! Admin category management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::super::catalog::CategoryItem;
use super::super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateCategoryRequest {
    pub name: String,
}

pub(in crate::api) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CategoryItem>>>, ApiError> {
    let rows = maracas_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(CategoryItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// New categories land at the end of the display order.
pub(in crate::api) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryItem>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    if name.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "category name cannot be empty",
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("category name must be at most {MAX_NAME_LEN} characters"),
        ));
    }

    let slug = maracas_core::slug::slug_from_name(&name);

    let row = maracas_db::create_category(&state.pool, &name, &slug)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::new(rid, "conflict", "a category with that name already exists")
            } else {
                map_db_error(rid.clone(), &e)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CategoryItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(in crate::api) async fn delete_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let removed = maracas_db::delete_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if removed == 0 {
        return Err(ApiError::new(req_id.0, "not_found", "category not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
