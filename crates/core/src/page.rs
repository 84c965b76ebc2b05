use thiserror::Error;

use crate::cart::{CartError, ShoppingCart};
use crate::draft::{DraftError, DraftForm, ValidationPolicy};
use crate::types::{CreateProductRequest, Price, Product};

/// Whether a create+refresh sequence is currently running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    InFlight,
}

/// All client-local state of the inventory page.
///
/// The product list cache, the draft form, the cart and the submission gate
/// are only changed through the transition methods below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    products: Vec<Product>,
    draft: DraftForm,
    cart: ShoppingCart,
    submission: SubmissionStatus,
    banner: Option<String>,
}

impl PageState {
    /// Creates the state for a freshly loaded page.
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn draft(&self) -> &DraftForm {
        &self.draft
    }

    pub fn cart(&self) -> &ShoppingCart {
        &self.cart
    }

    pub fn submission(&self) -> SubmissionStatus {
        self.submission
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Returns `true` while the submit control must stay disabled.
    pub fn submit_enabled(&self) -> bool {
        self.submission == SubmissionStatus::Idle
    }

    /// Returns `true` when the page should show the "no products" state
    /// instead of an empty table.
    pub fn shows_empty_state(&self) -> bool {
        self.products.is_empty()
    }

    /// Replaces the cached product list wholesale.
    pub fn replace_products(&mut self, products: Vec<Product>) {
        self.products = products;
    }

    pub fn update_draft<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut DraftForm),
    {
        edit(&mut self.draft);
    }

    pub fn add_to_cart(&mut self, product: Product) -> Result<Price, CartError> {
        self.cart.add(product)
    }

    pub fn remove_from_cart(&mut self, index: usize) -> Result<Product, CartError> {
        self.cart.remove(index)
    }

    /// Gates the submit control and produces the request body for the draft.
    pub fn begin_submission(
        &mut self,
        policy: ValidationPolicy,
    ) -> Result<CreateProductRequest, SubmitError> {
        if self.submission == SubmissionStatus::InFlight {
            return Err(SubmitError::InFlight);
        }

        match self.draft.to_request(policy) {
            Ok(request) => {
                self.submission = SubmissionStatus::InFlight;
                self.banner = None;
                Ok(request)
            }
            Err(err) => {
                self.banner = Some(err.to_string());
                Err(SubmitError::Draft(err))
            }
        }
    }

    /// Applies the refreshed list after a successful create.
    pub fn complete_submission(&mut self, products: Vec<Product>) {
        self.products = products;
        self.draft = DraftForm::default();
        self.banner = None;
        self.submission = SubmissionStatus::Idle;
    }

    /// Records a failed create or refresh; the draft stays for re-submission.
    pub fn fail_submission(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
        self.submission = SubmissionStatus::Idle;
    }

    /// Records a failed standalone refresh; the previous list is kept.
    pub fn fail_refresh(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
    }

    /// Shows `message` without touching the list, draft or cart.
    pub fn show_banner(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }
}

/// Reasons a submission does not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    InFlight,
    #[error("{0}")]
    Draft(#[from] DraftError),
}
