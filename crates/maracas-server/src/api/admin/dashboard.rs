//! Admin dashboard: headline counts and the all-time revenue figure.

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(in crate::api) struct DashboardSummary {
    pub product_count: i64,
    pub order_count: i64,
    pub manual_sale_count: i64,
    pub total_revenue_cents: i64,
}

pub(in crate::api) async fn summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let (product_count, order_count, manual_sale_count, order_revenue, manual_revenue) = tokio::try_join!(
        maracas_db::count_products(&state.pool),
        maracas_db::count_orders(&state.pool),
        maracas_db::count_manual_sales(&state.pool),
        maracas_db::sum_paid_order_totals(&state.pool),
        maracas_db::sum_manual_sale_totals(&state.pool),
    )
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: DashboardSummary {
            product_count,
            order_count,
            manual_sale_count,
            total_revenue_cents: order_revenue + manual_revenue,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
