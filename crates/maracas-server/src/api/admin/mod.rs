//! Admin console endpoints. Every route here sits behind the admin guard
//! middleware plus the shared rate limit.

mod categories;
mod dashboard;
mod manual_sales;
mod orders;
mod products;
mod revenue;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;

use crate::middleware::{enforce_rate_limit, require_admin, RateLimitState};

use super::AppState;

pub(super) fn router(state: AppState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/dashboard", get(dashboard::summary))
        .route(
            "/api/v1/admin/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/v1/admin/products/{id}",
            put(products::update_product).delete(products::delete_product),
        )
        .route("/api/v1/admin/media", post(products::upload_image))
        .route(
            "/api/v1/admin/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/v1/admin/categories/{id}",
            delete(categories::delete_category),
        )
        .route("/api/v1/admin/orders", get(orders::list_orders))
        .route(
            "/api/v1/admin/orders/{id}/delivery-status",
            patch(orders::update_delivery_status),
        )
        .route("/api/v1/admin/orders/{id}", delete(orders::delete_order))
        .route(
            "/api/v1/admin/manual-sales",
            get(manual_sales::list_manual_sales).post(manual_sales::create_manual_sale),
        )
        .route("/api/v1/admin/revenue", get(revenue::report))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(state, require_admin)),
        )
}
