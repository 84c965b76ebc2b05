//! Domain types and client-local page state for the inventory system.

pub mod cart;
pub mod draft;
pub mod page;
pub mod types;

pub use cart::{cart_total, CartError, ShoppingCart};
pub use draft::{DraftError, DraftForm, ValidationPolicy};
pub use page::{PageState, SubmissionStatus, SubmitError};
pub use types::{CreateProductRequest, NewProduct, Price, Product, ValidationError};
