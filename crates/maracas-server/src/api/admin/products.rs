//! Admin product management: listing, create, full update, delete, and
//! image upload.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maracas_db::NewProduct;

use crate::media::MediaError;
use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState, ProductItem, ResponseMeta};

const MAX_NAME_LEN: usize = 200;
const MAX_CATEGORY_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Full field set for both create and update; the slug is always re-derived
/// from the name.
#[derive(Debug, Deserialize)]
pub(in crate::api) struct ProductPayload {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: Option<String>,
    pub stock_qty: i32,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    pub image_url: Option<String>,
}

fn default_is_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct UploadQuery {
    /// File extension of the uploaded image, e.g. `png`.
    pub ext: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct UploadResponse {
    pub url: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

struct ValidatedProduct {
    name: String,
    slug: String,
    description: Option<String>,
    category: Option<String>,
}

fn validate_payload(request_id: &str, body: &ProductPayload) -> Result<ValidatedProduct, ApiError> {
    let name = body.name.trim().to_owned();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("name must be 1–{MAX_NAME_LEN} characters"),
        ));
    }
    if body.price_cents < 0 {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "price_cents must not be negative",
        ));
    }
    if body.stock_qty < 0 {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "stock_qty must not be negative",
        ));
    }

    let category = body
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToOwned::to_owned);
    if let Some(ref c) = category {
        if c.len() > MAX_CATEGORY_LEN {
            return Err(ApiError::new(
                request_id,
                "validation_error",
                format!("category must be at most {MAX_CATEGORY_LEN} characters"),
            ));
        }
    }

    let slug = maracas_core::slug::slug_from_name(&name);
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(ToOwned::to_owned);

    Ok(ValidatedProduct {
        name,
        slug,
        description,
        category,
    })
}

fn map_slug_conflict(request_id: &str, error: &maracas_db::DbError) -> ApiError {
    if error.is_unique_violation() {
        return ApiError::new(
            request_id,
            "conflict",
            "a product with that name already exists",
        );
    }
    map_db_error(request_id.to_owned(), error)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(in crate::api) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let rows = maracas_db::list_all_products(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProductItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(in crate::api) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ProductPayload>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let rid = &req_id.0;
    let validated = validate_payload(rid, &body)?;

    let row = maracas_db::create_product(
        &state.pool,
        &NewProduct {
            name: &validated.name,
            slug: &validated.slug,
            description: validated.description.as_deref(),
            price_cents: body.price_cents,
            currency: maracas_core::CURRENCY,
            category: validated.category.as_deref(),
            stock_qty: body.stock_qty,
            is_active: body.is_active,
            image_url: body.image_url.as_deref(),
        },
    )
    .await
    .map_err(|e| map_slug_conflict(rid, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ProductItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(in crate::api) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductPayload>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let rid = &req_id.0;
    let validated = validate_payload(rid, &body)?;

    let row = maracas_db::update_product(
        &state.pool,
        id,
        &NewProduct {
            name: &validated.name,
            slug: &validated.slug,
            description: validated.description.as_deref(),
            price_cents: body.price_cents,
            currency: maracas_core::CURRENCY,
            category: validated.category.as_deref(),
            stock_qty: body.stock_qty,
            is_active: body.is_active,
            image_url: body.image_url.as_deref(),
        },
    )
    .await
    .map_err(|e| map_slug_conflict(rid, &e))?;

    let Some(row) = row else {
        return Err(ApiError::new(rid, "not_found", "product not found"));
    };

    Ok(Json(ApiResponse {
        data: ProductItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(in crate::api) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let removed = maracas_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if removed == 0 {
        return Err(ApiError::new(req_id.0, "not_found", "product not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Accepts raw image bytes and returns the public URL of the stored file.
pub(in crate::api) async fn upload_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponse>>), ApiError> {
    let rid = &req_id.0;

    if body.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "image body is empty"));
    }

    let url = state.media.store(&query.ext, &body).map_err(|e| match e {
        MediaError::UnsupportedExtension(_) => {
            ApiError::new(rid, "validation_error", e.to_string())
        }
        MediaError::Io(io_err) => {
            tracing::error!(error = %io_err, "image write failed");
            ApiError::new(rid, "internal_error", "failed to store image")
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: UploadResponse { url },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
