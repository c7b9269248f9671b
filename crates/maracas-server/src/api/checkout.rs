//! Checkout: converts a cart into an order plus line items.
//!
//! The writes are sequential, independent statements — order number, then
//! the order, then one insert per line. A failure before the order insert
//! leaves nothing behind; a failure among the line inserts leaves the order
//! and any earlier lines persisted, and the client sees a single failure
//! notification.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maracas_core::checkout::CheckoutDetails;
use maracas_db::{NewOrder, NewOrderItem};

use crate::middleware::RequestId;

use super::cart::cart_token;
use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    /// When true, the submitted details are kept for the next checkout.
    #[serde(default)]
    pub save_details: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckoutResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub total_cents: i64,
    pub total_display: String,
    pub message: String,
}

pub(super) async fn place_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutResponse>>), ApiError> {
    let rid = &req_id.0;
    let token = cart_token(&headers, rid)?;

    let details = CheckoutDetails {
        customer_name: body.customer_name.trim().to_owned(),
        customer_email: body.customer_email.trim().to_owned(),
        customer_phone: body.customer_phone.trim().to_owned(),
        address_line1: body.address_line1.trim().to_owned(),
        address_line2: body
            .address_line2
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned),
    };
    details
        .validate()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let cart = state.carts.lock().await.cart(&token);
    if cart.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "cart is empty"));
    }

    // Step 1: order number. A failure here aborts before anything is written.
    let order_number = maracas_db::next_order_number(&state.pool)
        .await
        .map_err(|e| order_failure(rid, &e))?;

    // Step 2: the order record, carrying the cart's derived total.
    let order = maracas_db::insert_order(
        &state.pool,
        &NewOrder {
            order_number: &order_number,
            total_cents: cart.total_cents(),
            customer_name: &details.customer_name,
            customer_email: &details.customer_email,
            customer_phone: &details.customer_phone,
            address_line1: &details.address_line1,
            address_line2: details.address_line2.as_deref(),
            country: maracas_core::ORDER_COUNTRY,
        },
    )
    .await
    .map_err(|e| order_failure(rid, &e))?;

    // Step 3: one line per cart item, in cart order. A failed insert leaves
    // the order and any earlier lines in place.
    for item in &cart.items {
        maracas_db::insert_order_item(
            &state.pool,
            order.id,
            &NewOrderItem {
                product_id: item.product_id,
                product_name: &item.name,
                quantity: i32::try_from(item.quantity).unwrap_or(i32::MAX),
                unit_price_cents: item.unit_price_cents,
            },
        )
        .await
        .map_err(|e| order_failure(rid, &e))?;
    }

    // Step 4: housekeeping. Neither store write can undo the order, so
    // failures here are logged and the success response stands.
    if body.save_details {
        let mut saved = state.saved_details.lock().await;
        if let Err(e) = saved.save(&token, details.clone()) {
            tracing::warn!(error = %e, "failed to save checkout details");
        }
    }
    {
        let mut carts = state.carts.lock().await;
        if let Err(e) = carts.clear(&token) {
            tracing::warn!(error = %e, "failed to clear cart after checkout");
        }
    }

    let message = format!("Order {order_number} placed successfully! We'll contact you shortly.");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CheckoutResponse {
                order_id: order.id,
                order_number: order.order_number,
                total_display: maracas_core::money::format_minor_units(order.total_cents),
                total_cents: order.total_cents,
                message,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// Returns the details the shopper opted to keep at a previous checkout, or
/// `null` when none are stored.
pub(super) async fn saved_details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Option<CheckoutDetails>>>, ApiError> {
    let token = cart_token(&headers, &req_id.0)?;
    let details = state.saved_details.lock().await.get(&token);

    Ok(Json(ApiResponse {
        data: details,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn order_failure(request_id: &str, error: &maracas_db::DbError) -> ApiError {
    tracing::error!(error = %error, "order placement failed");
    ApiError::new(
        request_id,
        "internal_error",
        "failed to place order, please try again",
    )
}
