use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info, warn};

use inventory_core::cart::CartError;
use inventory_core::draft::{DraftForm, ValidationPolicy};
use inventory_core::page::{PageState, SubmitError};
use inventory_core::types::{CreateProductRequest, Price, Product};

use crate::api::{ApiError, ProductApi};

/// Drives a [`PageState`] from user actions and query endpoint responses.
///
/// State is only locked between network calls, never across them, so a
/// second `submit` issued while one is awaiting the API observes the
/// in-flight gate.
pub struct PageController<A> {
    api: A,
    policy: ValidationPolicy,
    state: Mutex<PageState>,
}

impl<A> PageController<A>
where
    A: ProductApi,
{
    pub fn new(api: A, policy: ValidationPolicy) -> Self {
        Self::with_products(api, policy, Vec::new())
    }

    /// Starts from a product list that was fetched before the page was shown.
    pub fn with_products(api: A, policy: ValidationPolicy, products: Vec<Product>) -> Self {
        Self {
            api,
            policy,
            state: Mutex::new(PageState::new(products)),
        }
    }

    /// Populates the product list cache before first display.
    pub async fn load_initial(&self) -> Result<(), ControllerError> {
        let products = self.api.list().await?;
        debug!(stage = "page", count = products.len(), "initial product list loaded");
        self.lock().replace_products(products);
        Ok(())
    }

    /// Re-fetches the product list and replaces the cache wholesale.
    pub async fn refresh(&self) -> Result<Vec<Product>, ControllerError> {
        match self.api.list().await {
            Ok(products) => {
                self.lock().replace_products(products.clone());
                Ok(products)
            }
            Err(err) => {
                warn!(stage = "page", error = %err, "product refresh failed");
                self.lock().fail_refresh(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Submits the draft: create, then refresh once the create has answered.
    pub async fn submit(&self) -> Result<(), ControllerError> {
        let request = self.lock().begin_submission(self.policy)?;

        match self.create_then_list(&request).await {
            Ok(products) => {
                info!(stage = "page", product = %request.name, count = products.len(), "product submitted");
                self.lock().complete_submission(products);
                Ok(())
            }
            Err(err) => {
                warn!(stage = "page", product = %request.name, error = %err, "product submission failed");
                self.lock().fail_submission(err.to_string());
                Err(err.into())
            }
        }
    }

    async fn create_then_list(
        &self,
        request: &CreateProductRequest,
    ) -> Result<Vec<Product>, ApiError> {
        let created = self.api.create(request).await?;
        debug!(stage = "page", id = %created.id, "product created");
        self.api.list().await
    }

    pub fn add_to_cart(&self, product: Product) -> Result<Price, CartError> {
        self.lock().add_to_cart(product)
    }

    pub fn remove_from_cart(&self, index: usize) -> Result<Product, CartError> {
        self.lock().remove_from_cart(index)
    }

    pub fn update_draft<F>(&self, edit: F)
    where
        F: FnOnce(&mut DraftForm),
    {
        self.lock().update_draft(edit);
    }

    /// Returns a copy of the current page state.
    pub fn snapshot(&self) -> PageState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().expect("page state poisoned")
    }
}

/// Errors surfaced by controller transitions.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Api(#[from] ApiError),
}
