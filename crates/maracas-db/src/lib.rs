use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/maracas-db/Cargo.toml; resolves to
// <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &maracas_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// True when the error is a Postgres unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.has_pg_code("23505")
    }

    /// True when the error is a Postgres foreign-key violation.
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        self.has_pg_code("23503")
    }

    fn has_pg_code(&self, code: &str) -> bool {
        if let DbError::Sqlx(sqlx::Error::Database(db_err)) = self {
            return db_err.code().as_deref() == Some(code);
        }
        false
    }
}

/// Connect to a Postgres pool using an explicit URL and pool settings.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`DbError`] if the probe query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}


pub mod auth;
pub mod categories;
pub mod manual_sales;
pub mod orders;
pub mod products;
pub mod wishlist;

pub use auth::{
    get_session, grant_role, has_role, sign_in, sign_out, sign_up, AuthError, SessionIdentity,
    UserRow,
};
pub use categories::{create_category, delete_category, list_categories, CategoryRow};
pub use manual_sales::{
    count_manual_sales, insert_manual_sale, list_manual_sales, sum_manual_sale_totals,
    ManualSaleRow, NewManualSale,
};
pub use orders::{
    count_orders, delete_order, insert_order, insert_order_item, list_order_items, list_orders,
    list_paid_orders, next_order_number, sum_paid_order_totals, update_delivery_status, NewOrder,
    NewOrderItem, OrderItemRow, OrderRow,
};
pub use products::{
    count_products, create_product, delete_product, get_product, get_product_by_slug,
    list_active_products, list_all_products, list_featured_products, search_active_products,
    update_product, NewProduct, ProductRow, ProductSort,
};
pub use wishlist::{is_wishlisted, list_wishlist_products, toggle_wishlist};
