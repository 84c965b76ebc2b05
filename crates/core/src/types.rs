use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Monetary amount held as integer cents.
///
/// On the wire a price is a JSON number in major units (`9.99`), which keeps
/// the HTTP contract a plain number while sums stay exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Self = Self(0);

    /// Largest price the store accepts for a single product ($1,000,000,000.00).
    pub const MAX: Self = Self(100_000_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Converts a major-unit amount, rounding to the nearest cent.
    ///
    /// Returns `None` for NaN, infinities and values outside the `i64` cent range.
    pub fn from_major(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns `None` when the sum leaves the `i64` cent range.
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(D::Error::custom("price must be a finite number"));
        }
        Price::from_major(value)
            .ok_or_else(|| D::Error::custom(format!("price {value} is out of range")))
    }
}

/// A sellable item as persisted by the product store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub inventory: i64,
    pub created_at: DateTime<Utc>,
}

/// Body of a create request as sent by clients.
///
/// `price` and `inventory` are optional so that a client which failed to parse
/// its numeric inputs can still defer the decision to the store, which
/// rejects the missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub inventory: Option<i64>,
}

impl CreateProductRequest {
    /// Validates the request before it reaches the store.
    pub fn validate(&self) -> Result<NewProduct, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::MissingDescription);
        }

        let price = self.price.ok_or(ValidationError::MissingPrice)?;
        if price.is_negative() {
            return Err(ValidationError::NegativePrice(price));
        }
        if price > Price::MAX {
            return Err(ValidationError::PriceTooLarge(price));
        }
        let inventory = self.inventory.ok_or(ValidationError::MissingInventory)?;
        if inventory < 0 {
            return Err(ValidationError::NegativeInventory(inventory));
        }

        Ok(NewProduct {
            name: name.to_string(),
            description: description.to_string(),
            price,
            inventory,
        })
    }
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub inventory: i64,
}

impl NewProduct {
    /// Attaches the store-assigned fields.
    pub fn into_product(self, id: String, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            inventory: self.inventory,
            created_at,
        }
    }
}

/// Reasons a create request is rejected by the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    MissingName,
    #[error("description must not be empty")]
    MissingDescription,
    #[error("price is missing or not a number")]
    MissingPrice,
    #[error("price must not be negative (got {0})")]
    NegativePrice(Price),
    #[error("price must not exceed {} (got {0})", Price::MAX)]
    PriceTooLarge(Price),
    #[error("inventory is missing or not an integer")]
    MissingInventory,
    #[error("inventory must not be negative (got {0})")]
    NegativeInventory(i64),
}
