//! Database operations for the `categories` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Returns all categories in display order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, slug, display_order, created_at \
         FROM categories \
         ORDER BY display_order ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a category at the end of the display order.
///
/// The next `display_order` is computed inside the statement so concurrent
/// inserts cannot read a stale maximum.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate slug shows up
/// as a unique violation (see [`DbError::is_unique_violation`]).
pub async fn create_category(pool: &PgPool, name: &str, slug: &str) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO categories (name, slug, display_order) \
         VALUES ($1, $2, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM categories)) \
         RETURNING id, name, slug, display_order, created_at",
    )
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Deletes a category. Returns the number of rows removed (0 or 1).
///
/// Products keep their category label; the label simply stops matching a
/// category row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_category(pool: &PgPool, id: Uuid) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
