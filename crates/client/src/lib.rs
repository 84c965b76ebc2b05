pub mod api;
pub mod controller;

pub use api::{ApiError, InventoryClient, ProductApi};
pub use controller::{ControllerError, PageController};
