//! Admin order management: listing with nested line items, delivery-status
//! transitions, and deletion.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Delivery statuses an admin may set.
const DELIVERY_STATUSES: &[&str] = &["pending", "completed"];

#[derive(Debug, Serialize)]
pub(in crate::api) struct OrderItemView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub total_cents: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub country: String,
    pub payment_status: String,
    pub delivery_status: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdateDeliveryStatusRequest {
    pub delivery_status: String,
}

pub(in crate::api) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ApiError> {
    let rid = &req_id.0;

    let orders = maracas_db::list_orders(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = maracas_db::list_order_items(&state.pool, &order_ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for item in items {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemView {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                line_total_cents: maracas_core::money::line_total(
                    item.unit_price_cents,
                    u32::try_from(item.quantity).unwrap_or(0),
                ),
            });
    }

    let data = orders
        .into_iter()
        .map(|order| OrderView {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            id: order.id,
            order_number: order.order_number,
            total_cents: order.total_cents,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            address_line1: order.address_line1,
            address_line2: order.address_line2,
            country: order.country,
            payment_status: order.payment_status,
            delivery_status: order.delivery_status,
            created_at: order.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(in crate::api) async fn update_delivery_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDeliveryStatusRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;

    if !DELIVERY_STATUSES.contains(&body.delivery_status.as_str()) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!(
                "delivery_status must be one of: {}",
                DELIVERY_STATUSES.join(", ")
            ),
        ));
    }

    let updated = maracas_db::update_delivery_status(&state.pool, id, &body.delivery_status)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    if updated == 0 {
        return Err(ApiError::new(rid, "not_found", "order not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "message": "Order status updated" }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(in crate::api) async fn delete_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let removed = maracas_db::delete_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if removed == 0 {
        return Err(ApiError::new(req_id.0, "not_found", "order not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
