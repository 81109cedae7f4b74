//! Shared types and domain rules for the Inventory Management service
//!
//! Everything in this crate is free of I/O: the backend owns the database and
//! HTTP layers and calls into these rules for normalization, validation, stock
//! arithmetic, spreadsheet import and analytics bucketing.

pub mod analytics;
pub mod import;
pub mod ledger;
pub mod models;
pub mod normalize;
pub mod spreadsheet;
pub mod types;
pub mod validation;

pub use models::*;
pub use normalize::fold;
pub use types::*;
