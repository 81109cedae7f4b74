//! Business logic services for the Inventory Management service

pub mod analytics;
pub mod audit;
pub mod auth;
pub mod crud;
pub mod import;
pub mod ledger;
pub mod movement;
pub mod product;
pub mod supplier;
pub mod user;

pub use analytics::AnalyticsService;
pub use audit::ActivityService;
pub use auth::AuthService;
pub use crud::{CrudService, Resource};
pub use import::ImportService;
pub use movement::MovementService;
pub use product::ProductService;
pub use user::UserService;
