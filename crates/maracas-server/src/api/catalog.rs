//! Storefront catalog endpoints: product listing, search, detail, and
//! categories. Thin query-parameter translation over the database layer.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maracas_db::ProductSort;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ProductItem, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ProductListQuery {
    /// Comma-separated category slugs.
    pub category: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeaturedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CategoryItem {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<maracas_db::CategoryRow> for CategoryItem {
    fn from(row: maracas_db::CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            display_order: row.display_order,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let categories: Vec<String> = query
        .category
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    let sort = ProductSort::from_key(query.sort.as_deref().unwrap_or_default());

    let rows = maracas_db::list_active_products(&state.pool, &categories, sort)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProductItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_featured_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FeaturedQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let rows = maracas_db::list_featured_products(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProductItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn search_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let term = query.q.as_deref().unwrap_or_default().trim().to_owned();

    // An empty search returns nothing without touching the database.
    if term.is_empty() {
        return Ok(Json(ApiResponse {
            data: Vec::new(),
            meta: ResponseMeta::new(req_id.0),
        }));
    }

    let rows = maracas_db::search_active_products(&state.pool, &term)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProductItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let row = maracas_db::get_product_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let Some(row) = row else {
        return Err(ApiError::new(req_id.0, "not_found", "product not found"));
    };

    Ok(Json(ApiResponse {
        data: ProductItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_categories(
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
