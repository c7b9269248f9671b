//! Cart endpoints.
//!
//! Carts are addressed by the opaque `x-cart-token` header a client picks
//! for itself; the server snapshots product data into the cart at add time
//! so later price edits do not change what the shopper agreed to.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maracas_core::cart::{Cart, CartItem};

use crate::middleware::RequestId;

use super::{map_db_error, map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

pub(super) const CART_TOKEN_HEADER: &str = "x-cart-token";

#[derive(Debug, Deserialize)]
pub(super) struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct CartItemView {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct CartView {
    pub items: Vec<CartItemView>,
    pub total_cents: i64,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let total_cents = cart.total_cents();
        let items = cart
            .items
            .into_iter()
            .map(|item| CartItemView {
                line_total_cents: maracas_core::money::line_total(
                    item.unit_price_cents,
                    item.quantity,
                ),
                product_id: item.product_id,
                name: item.name,
                slug: item.slug,
                image_url: item.image_url,
                unit_price_cents: item.unit_price_cents,
                quantity: item.quantity,
            })
            .collect();
        Self { items, total_cents }
    }
}

/// Pulls the cart token out of the request headers.
pub(super) fn cart_token(headers: &HeaderMap, request_id: &str) -> Result<String, ApiError> {
    headers
        .get(CART_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ApiError::new(
                request_id,
                "bad_request",
                format!("missing {CART_TOKEN_HEADER} header"),
            )
        })
}

pub(super) async fn get_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let token = cart_token(&headers, &req_id.0)?;
    let cart = state.carts.lock().await.cart(&token);

    Ok(Json(ApiResponse {
        data: CartView::from(cart),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn add_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let rid = &req_id.0;
    let token = cart_token(&headers, rid)?;

    if body.quantity == 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "quantity must be at least 1",
        ));
    }

    let product = maracas_db::get_product(&state.pool, body.product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let Some(product) = product else {
        return Err(ApiError::new(rid, "not_found", "product not found"));
    };
    if !product.is_active {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "product is not available",
        ));
    }

    let item = CartItem {
        product_id: product.id,
        name: product.name,
        slug: product.slug,
        image_url: product.image_url,
        unit_price_cents: product.price_cents,
        quantity: body.quantity,
    };

    let cart = state
        .carts
        .lock()
        .await
        .add_item(&token, item)
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CartView::from(cart),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let token = cart_token(&headers, &req_id.0)?;

    let cart = state
        .carts
        .lock()
        .await
        .update_quantity(&token, product_id, body.quantity)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CartView::from(cart),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn remove_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let token = cart_token(&headers, &req_id.0)?;

    let cart = state
        .carts
        .lock()
        .await
        .remove_item(&token, product_id)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CartView::from(cart),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn clear_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let token = cart_token(&headers, &req_id.0)?;

    let mut carts = state.carts.lock().await;
    carts
        .clear(&token)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    let cart = carts.cart(&token);
    drop(carts);

    Ok(Json(ApiResponse {
        data: CartView::from(cart),
        meta: ResponseMeta::new(req_id.0),
    }))
}
