use thiserror::Error;

use crate::types::{CreateProductRequest, Price};

/// Raw text of the new-product form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub inventory: String,
}

/// How much of the numeric validation happens before a draft is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Numbers must parse and be in range before submission.
    Strict,
    /// Unparseable numbers are sent as `null` and negatives pass through;
    /// the store is the only gate.
    StoreSide,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::Strict
    }
}

impl DraftForm {
    /// Builds the create request body according to `policy`.
    ///
    /// Name and description are required under every policy.
    pub fn to_request(&self, policy: ValidationPolicy) -> Result<CreateProductRequest, DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingName);
        }
        if self.description.trim().is_empty() {
            return Err(DraftError::MissingDescription);
        }

        let price = parse_price(&self.price);
        let inventory = parse_inventory(&self.inventory);

        if policy == ValidationPolicy::Strict {
            let price = price.ok_or_else(|| DraftError::InvalidPrice(self.price.clone()))?;
            if price.is_negative() {
                return Err(DraftError::NegativePrice(price));
            }
            if price > Price::MAX {
                return Err(DraftError::PriceTooLarge(price));
            }
            let inventory =
                inventory.ok_or_else(|| DraftError::InvalidInventory(self.inventory.clone()))?;
            if inventory < 0 {
                return Err(DraftError::NegativeInventory(inventory));
            }
        }

        Ok(CreateProductRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            price,
            inventory,
        })
    }
}

fn parse_price(raw: &str) -> Option<Price> {
    raw.trim().parse::<f64>().ok().and_then(Price::from_major)
}

fn parse_inventory(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Draft problems detected before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("item name is required")]
    MissingName,
    #[error("description is required")]
    MissingDescription,
    #[error("price '{0}' is not a number")]
    InvalidPrice(String),
    #[error("price must not be negative (got {0})")]
    NegativePrice(Price),
    #[error("price must not exceed {} (got {0})", Price::MAX)]
    PriceTooLarge(Price),
    #[error("inventory '{0}' is not an integer")]
    InvalidInventory(String),
    #[error("inventory must not be negative (got {0})")]
    NegativeInventory(i64),
}
