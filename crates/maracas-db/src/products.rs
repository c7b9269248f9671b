//! Database operations for the `products` catalog table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `products` table.
///
/// `price_cents` is an integer number of cents; the schema never stores a
/// decimal price. `category` is a free label matched against category slugs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub category: Option<String>,
    pub stock_qty: i32,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price_cents, currency, category, \
     stock_qty, is_active, image_url, created_at, updated_at";

/// Sort orders the storefront product listing supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceLowFirst,
    PriceHighFirst,
    Name,
}

impl ProductSort {
    /// Maps the storefront's query-string sort keys; unknown keys fall back
    /// to newest-first.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key {
            "price-low" => Self::PriceLowFirst,
            "price-high" => Self::PriceHighFirst,
            "name" => Self::Name,
            _ => Self::Newest,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC",
            Self::PriceLowFirst => "price_cents ASC",
            Self::PriceHighFirst => "price_cents DESC",
            Self::Name => "name ASC",
        }
    }
}

/// Field set for creating or fully updating a product.
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub price_cents: i64,
    pub currency: &'a str,
    pub category: Option<&'a str>,
    pub stock_qty: i32,
    pub is_active: bool,
    pub image_url: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Storefront queries
// ---------------------------------------------------------------------------

/// Returns active products, optionally restricted to a set of category
/// labels, in the requested order.
///
/// An empty `categories` slice means no category filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_products(
    pool: &PgPool,
    categories: &[String],
    sort: ProductSort,
) -> Result<Vec<ProductRow>, DbError> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products \
         WHERE is_active = TRUE \
           AND (cardinality($1::TEXT[]) = 0 OR category = ANY($1)) \
         ORDER BY {}",
        sort.order_by()
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(categories.to_vec())
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns the newest active products, capped at `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_featured_products(pool: &PgPool, limit: i64) -> Result<Vec<ProductRow>, DbError> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products \
         WHERE is_active = TRUE \
         ORDER BY created_at DESC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns a single product by slug (active or not), or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_slug(pool: &PgPool, slug: &str) -> Result<Option<ProductRow>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Returns a single product by id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Option<ProductRow>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Case-insensitive substring search over active products' names and
/// descriptions, ordered by name.
///
/// `%` and `_` in the query are escaped so they match literally.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_active_products(pool: &PgPool, query: &str) -> Result<Vec<ProductRow>, DbError> {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{escaped}%");

    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products \
         WHERE is_active = TRUE \
           AND (name ILIKE $1 OR description ILIKE $1) \
         ORDER BY name"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(pattern)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Admin operations
// ---------------------------------------------------------------------------

/// Returns every product, newest first, for the admin console.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, ProductRow>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

/// Inserts a product and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate slug shows up
/// as a unique violation (see [`DbError::is_unique_violation`]).
pub async fn create_product(pool: &PgPool, product: &NewProduct<'_>) -> Result<ProductRow, DbError> {
    let sql = format!(
        "INSERT INTO products \
             (name, slug, description, price_cents, currency, category, \
              stock_qty, is_active, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(product.name)
        .bind(product.slug)
        .bind(product.description)
        .bind(product.price_cents)
        .bind(product.currency)
        .bind(product.category)
        .bind(product.stock_qty)
        .bind(product.is_active)
        .bind(product.image_url)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Replaces every editable field of a product and returns the stored row,
/// or `None` when the id is unknown.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    product: &NewProduct<'_>,
) -> Result<Option<ProductRow>, DbError> {
    let sql = format!(
        "UPDATE products SET \
             name = $2, slug = $3, description = $4, price_cents = $5, \
             currency = $6, category = $7, stock_qty = $8, is_active = $9, \
             image_url = $10, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .bind(product.name)
        .bind(product.slug)
        .bind(product.description)
        .bind(product.price_cents)
        .bind(product.currency)
        .bind(product.category)
        .bind(product.stock_qty)
        .bind(product.is_active)
        .bind(product.image_url)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Deletes a product. Returns the number of rows removed (0 or 1).
///
/// Orders keep their denormalized line items; wishlist entries cascade.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Total number of products, active or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
