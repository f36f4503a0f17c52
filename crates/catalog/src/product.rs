use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Money, ProductId};

/// Catalog product.
///
/// `stock` is only changed by the order reservation path (decrement) and by
/// the explicit stock patch (overwrite). It is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
}

/// Request: create a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i64,
}

impl NewProduct {
    /// Validate and normalize the request (name is trimmed).
    ///
    /// Price non-negativity is already guaranteed by `Money`.
    pub fn validate(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("product name is required"));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock must be >= 0"));
        }
        Ok(Self {
            name,
            price: self.price,
            stock: self.stock,
        })
    }
}

/// Request: overwrite a product's stock level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPatch {
    pub stock: i64,
}

impl StockPatch {
    pub fn validate(self) -> DomainResult<Self> {
        if self.stock < 0 {
            return Err(DomainError::validation("stock must be >= 0"));
        }
        Ok(self)
    }
}

/// Request: change a product's unit price. Existing order lines keep theirs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePatch {
    pub price: Money,
}
