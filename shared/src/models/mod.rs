//! Domain models for the Inventory Management service

mod activity;
mod movement;
mod product;
mod supplier;
mod user;

pub use activity::*;
pub use movement::*;
pub use product::*;
pub use supplier::*;
pub use user::*;
