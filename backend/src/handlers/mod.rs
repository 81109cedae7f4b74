//! HTTP request handlers

pub mod activity;
pub mod analytics;
pub mod auth;
pub mod crud;
pub mod health;
pub mod movements;
pub mod products;
pub mod users;

pub use activity::list_activity;
pub use analytics::{
    get_dashboard, get_low_stock_report, get_movement_history, get_supplier_purchases,
    get_turnover_report,
};
pub use auth::{login, refresh, register};
pub use crud::{create_resource, delete_resource, get_resource, list_resources, update_resource};
pub use health::health_check;
pub use movements::{create_movement, get_movement, list_movements};
pub use products::{delete_all_products, import_products, search_products};
pub use users::{delete_user, get_profile, list_users, update_profile};
