//! Database operations for the `wishlist` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::products::ProductRow;
use crate::DbError;

/// Toggles a wishlist pair: removes it when present, inserts it otherwise.
///
/// Returns `true` when the product is in the wishlist after the call. The
/// unique constraint on `(user_id, product_id)` makes a racing double-insert
/// collapse into a no-op rather than an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails, including a
/// foreign-key violation when the product id is unknown.
pub async fn toggle_wishlist(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<bool, DbError> {
    let removed = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?
        .rows_affected();

    if removed > 0 {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO wishlist (user_id, product_id) \
         VALUES ($1, $2) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(true)
}

/// True when the user has wishlisted the product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_wishlisted(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM wishlist WHERE user_id = $1 AND product_id = $2)",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Returns the user's wishlisted products, most recently added first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_wishlist_products(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT p.id, p.name, p.slug, p.description, p.price_cents, p.currency, \
                p.category, p.stock_qty, p.is_active, p.image_url, p.created_at, \
                p.updated_at \
         FROM wishlist w \
         JOIN products p ON p.id = w.product_id \
         WHERE w.user_id = $1 \
         ORDER BY w.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
