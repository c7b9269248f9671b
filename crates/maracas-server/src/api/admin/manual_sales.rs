//! Admin manual-sales management: recording walk-in sales and listing them.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maracas_db::NewManualSale;

use crate::middleware::{CurrentUser, RequestId};

use super::super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateManualSaleRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price actually charged, in cents; may differ from the catalog
    /// price.
    pub price_cents: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ManualSaleView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub price_cents: i64,
    pub line_total_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub(in crate::api) async fn list_manual_sales(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ManualSaleView>>>, ApiError> {
    let rows = maracas_db::list_manual_sales(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ManualSaleView {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            price_cents: row.price_cents,
            line_total_cents: maracas_core::money::line_total(
                row.price_cents,
                u32::try_from(row.quantity).unwrap_or(0),
            ),
            notes: row.notes,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(in crate::api) async fn create_manual_sale(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(current_user): Extension<CurrentUser>,
    Json(body): Json<CreateManualSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), ApiError> {
    let rid = &req_id.0;

    if body.quantity < 1 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "quantity must be at least 1",
        ));
    }
    if body.price_cents < 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "price_cents must not be negative",
        ));
    }

    let notes = body
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let id = maracas_db::insert_manual_sale(
        &state.pool,
        &NewManualSale {
            product_id: body.product_id,
            quantity: body.quantity,
            price_cents: body.price_cents,
            notes,
            created_by: current_user.0.user_id,
        },
    )
    .await
    .map_err(|e| {
        if e.is_foreign_key_violation() {
            ApiError::new(rid, "validation_error", "unknown product")
        } else {
            map_db_error(rid.clone(), &e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: serde_json::json!({
                "id": id,
                "message": "Manual sale recorded successfully",
            }),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
