//! Wishlist endpoints. Both require a signed-in shopper.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, require_session, ApiError, ApiResponse, AppState, ProductItem, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ToggleResponse {
    pub product_id: Uuid,
    pub in_wishlist: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct MembershipResponse {
    pub product_id: Uuid,
    pub in_wishlist: bool,
}

pub(super) async fn list_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let identity = require_session(&state, &headers, &req_id.0).await?;

    let rows = maracas_db::list_wishlist_products(&state.pool, identity.user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProductItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Reports whether one product is in the shopper's wishlist, for surfaces
/// that show per-product wishlist state.
pub(super) async fn check_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MembershipResponse>>, ApiError> {
    let identity = require_session(&state, &headers, &req_id.0).await?;

    let in_wishlist = maracas_db::is_wishlisted(&state.pool, identity.user_id, product_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MembershipResponse {
            product_id,
            in_wishlist,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn toggle_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ToggleResponse>>, ApiError> {
    let rid = &req_id.0;
    let identity = require_session(&state, &headers, rid).await?;

    let in_wishlist = maracas_db::toggle_wishlist(&state.pool, identity.user_id, product_id)
        .await
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                ApiError::new(rid, "not_found", "product not found")
            } else {
                map_db_error(rid.clone(), &e)
            }
        })?;

    let message = if in_wishlist {
        "Added to wishlist"
    } else {
        "Removed from wishlist"
    };

    Ok(Json(ApiResponse {
        data: ToggleResponse {
            product_id,
            in_wishlist,
            message,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
