//! Revenue report: merges paid online orders and manual sales into all-time
//! and trailing-30-day totals, with the underlying rows for the breakdown
//! tables.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use maracas_core::revenue::{self, PaidOrder, RecordedSale, RevenueSummary};

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(in crate::api) struct RevenueOrderItem {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct RevenueSaleItem {
    pub id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub price_cents: i64,
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct RevenueReport {
    pub summary: RevenueSummary,
    pub orders: Vec<RevenueOrderItem>,
    pub manual_sales: Vec<RevenueSaleItem>,
}

/// Recomputed from scratch on every load; nothing here is cached.
pub(in crate::api) async fn report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RevenueReport>>, ApiError> {
    let rid = &req_id.0;

    let (orders, sales) = tokio::try_join!(
        maracas_db::list_paid_orders(&state.pool),
        maracas_db::list_manual_sales(&state.pool),
    )
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let paid: Vec<PaidOrder> = orders
        .iter()
        .map(|o| PaidOrder {
            total_cents: o.total_cents,
            created_at: o.created_at,
        })
        .collect();
    let recorded: Vec<RecordedSale> = sales
        .iter()
        .map(|s| RecordedSale {
            unit_price_cents: s.price_cents,
            quantity: u32::try_from(s.quantity).unwrap_or(0),
            created_at: s.created_at,
        })
        .collect();

    let summary = revenue::summarize(&paid, &recorded, Utc::now());

    let order_items = orders
        .into_iter()
        .map(|o| RevenueOrderItem {
            id: o.id,
            order_number: o.order_number,
            customer_name: o.customer_name,
            total_cents: o.total_cents,
            created_at: o.created_at,
        })
        .collect();
    let sale_items = sales
        .into_iter()
        .map(|s| RevenueSaleItem {
            id: s.id,
            product_name: s.product_name,
            quantity: s.quantity,
            line_total_cents: maracas_core::money::line_total(
                s.price_cents,
                u32::try_from(s.quantity).unwrap_or(0),
            ),
            price_cents: s.price_cents,
            created_at: s.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: RevenueReport {
            summary,
            orders: order_items,
            manual_sales: sale_items,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
