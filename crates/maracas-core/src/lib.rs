pub mod access;
pub mod app_config;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod money;
pub mod revenue;
pub mod slug;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};

/// Currency every amount in the system is denominated in.
pub const CURRENCY: &str = "TTD";

/// Country all orders are delivered within.
pub const ORDER_COUNTRY: &str = "Trinidad and Tobago";

/// Role label that grants access to the admin API.
pub const ADMIN_ROLE: &str = "admin";
