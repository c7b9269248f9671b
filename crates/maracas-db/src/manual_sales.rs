//! Database operations for the `manual_sales` table.
//!
//! Manual sales record walk-in transactions against stock items. They are
//! append-only from the API's point of view.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A manual sale joined with the product's current name.
///
/// `product_id`/`product_name` are `None` once the product has been deleted;
/// the sale itself (and its revenue) survives.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ManualSaleRow {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub price_cents: i64,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Field set for recording a manual sale.
#[derive(Debug, Clone)]
pub struct NewManualSale<'a> {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price actually charged; may differ from the catalog price.
    pub price_cents: i64,
    pub notes: Option<&'a str>,
    pub created_by: Uuid,
}

/// Records a manual sale and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a foreign-key
/// violation when the product id is unknown.
pub async fn insert_manual_sale(pool: &PgPool, sale: &NewManualSale<'_>) -> Result<Uuid, DbError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO manual_sales (product_id, quantity, price_cents, notes, created_by) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(sale.product_id)
    .bind(sale.quantity)
    .bind(sale.price_cents)
    .bind(sale.notes)
    .bind(sale.created_by)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns every manual sale, newest first, with product names joined in.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_manual_sales(pool: &PgPool) -> Result<Vec<ManualSaleRow>, DbError> {
    let rows = sqlx::query_as::<_, ManualSaleRow>(
        "SELECT ms.id, ms.product_id, p.name AS product_name, ms.quantity, \
                ms.price_cents, ms.notes, ms.created_by, ms.created_at \
         FROM manual_sales ms \
         LEFT JOIN products p ON p.id = ms.product_id \
         ORDER BY ms.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total number of manual sales.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_manual_sales(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM manual_sales")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Sum of `price_cents × quantity` over all manual sales, zero when there
/// are none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sum_manual_sale_totals(pool: &PgPool) -> Result<i64, DbError> {
    let sum = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(price_cents * quantity), 0)::BIGINT FROM manual_sales",
    )
    .fetch_one(pool)
    .await?;

    Ok(sum)
}
