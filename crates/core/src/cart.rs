use thiserror::Error;

use crate::types::{Price, Product};

/// Session-local list of selected products.
///
/// The total is recomputed from the entries after every mutation, so it
/// always reflects the committed sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingCart {
    entries: Vec<Product>,
    total: Price,
}

impl ShoppingCart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a copy of `product` and returns the new total.
    ///
    /// A product whose price would overflow the total is not added.
    pub fn add(&mut self, product: Product) -> Result<Price, CartError> {
        self.entries.push(product);
        match cart_total(&self.entries) {
            Ok(total) => {
                self.total = total;
                Ok(total)
            }
            Err(err) => {
                self.entries.pop();
                Err(err)
            }
        }
    }

    /// Removes the entry at `index` and returns it.
    pub fn remove(&mut self, index: usize) -> Result<Product, CartError> {
        if index >= self.entries.len() {
            return Err(CartError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let removed = self.entries.remove(index);
        match cart_total(&self.entries) {
            Ok(total) => {
                self.total = total;
                Ok(removed)
            }
            Err(err) => {
                self.entries.insert(index, removed);
                Err(err)
            }
        }
    }

    pub fn entries(&self) -> &[Product] {
        &self.entries
    }

    pub fn total(&self) -> Price {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sum of the prices of `entries`.
pub fn cart_total(entries: &[Product]) -> Result<Price, CartError> {
    entries.iter().try_fold(Price::ZERO, |total, product| {
        total
            .checked_add(product.price)
            .ok_or(CartError::TotalOverflow)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("cart position {index} is out of range (cart holds {len} items)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cart total is out of range")]
    TotalOverflow,
}
