//! Database operations for `orders` and `order_items`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
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
}

/// A row from the `order_items` table.
///
/// `product_id` is `None` once the referenced product has been deleted; the
/// denormalized `product_name` keeps the line readable regardless.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// Field set for creating an order. Both statuses start as `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub total_cents: i64,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub customer_phone: &'a str,
    pub address_line1: &'a str,
    pub address_line2: Option<&'a str>,
    pub country: &'a str,
}

/// Field set for one order line item.
#[derive(Debug, Clone)]
pub struct NewOrderItem<'a> {
    pub product_id: Uuid,
    pub product_name: &'a str,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

const ORDER_COLUMNS: &str = "id, order_number, total_cents, customer_name, customer_email, \
     customer_phone, address_line1, address_line2, country, payment_status, \
     delivery_status, created_at";

// ---------------------------------------------------------------------------
// Order placement
// ---------------------------------------------------------------------------

/// Asks the database for the next order number.
///
/// The number is generated server-side (`next_order_number()`), unique among
/// orders, sortable, and human-readable (`ORD-YYYYMMDD-NNNN`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the call fails.
pub async fn next_order_number(pool: &PgPool) -> Result<String, DbError> {
    let number = sqlx::query_scalar::<_, String>("SELECT next_order_number()")
        .fetch_one(pool)
        .await?;

    Ok(number)
}

/// Inserts an order with both statuses set to `pending` and returns the
/// stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_order(pool: &PgPool, order: &NewOrder<'_>) -> Result<OrderRow, DbError> {
    let sql = format!(
        "INSERT INTO orders \
             (order_number, total_cents, customer_name, customer_email, \
              customer_phone, address_line1, address_line2, country, \
              payment_status, delivery_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 'pending') \
         RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order.order_number)
        .bind(order.total_cents)
        .bind(order.customer_name)
        .bind(order.customer_email)
        .bind(order.customer_phone)
        .bind(order.address_line1)
        .bind(order.address_line2)
        .bind(order.country)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Inserts one line item for an order.
///
/// Issued once per cart line by checkout, in cart order. Each insert is an
/// independent statement; callers own the consequences of a mid-sequence
/// failure.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a foreign-key
/// violation when the product no longer exists.
pub async fn insert_order_item(
    pool: &PgPool,
    order_id: Uuid,
    item: &NewOrderItem<'_>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO order_items \
             (order_id, product_id, product_name, quantity, unit_price_cents) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .execute(pool)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Admin queries
// ---------------------------------------------------------------------------

/// Returns every order, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<OrderRow>, DbError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, OrderRow>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

/// Returns the line items belonging to any of `order_ids`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_order_items(
    pool: &PgPool,
    order_ids: &[Uuid],
) -> Result<Vec<OrderItemRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, product_name, quantity, unit_price_cents \
         FROM order_items \
         WHERE order_id = ANY($1)",
    )
    .bind(order_ids.to_vec())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns paid orders, newest first, for the revenue report.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_paid_orders(pool: &PgPool) -> Result<Vec<OrderRow>, DbError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} \
         FROM orders \
         WHERE payment_status = 'paid' \
         ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

/// Sets an order's delivery status. Returns the number of rows updated
/// (0 or 1).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_delivery_status(
    pool: &PgPool,
    id: Uuid,
    delivery_status: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query("UPDATE orders SET delivery_status = $2 WHERE id = $1")
        .bind(id)
        .bind(delivery_status)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes an order; its line items go with it via the FK cascade. Returns
/// the number of rows removed (0 or 1).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_order(pool: &PgPool, id: Uuid) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Total number of orders.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_orders(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Sum of `total_cents` over paid orders, zero when there are none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sum_paid_order_totals(pool: &PgPool) -> Result<i64, DbError> {
    let sum = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM orders WHERE payment_status = 'paid'",
    )
    .fetch_one(pool)
    .await?;

    Ok(sum)
}
