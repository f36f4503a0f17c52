//! Order creation failure taxonomy.

use thiserror::Error;

use storefront_core::{CustomerId, ProductId};

/// Why an order could not be created.
///
/// Every variant means the attempt had **zero** effect on catalog stock and
/// on the order ledger. Only `StoreUnavailable` is worth retrying as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Structural request failure; the store was never touched.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The unit of work could not begin, commit, or finish in time.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl OrderError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Stable machine-readable code (used in API error bodies and logs).
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::CustomerNotFound(_) => "customer_not_found",
            Self::ProductNotFound(_) => "product_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_failures_are_retryable() {
        assert!(OrderError::unavailable("timeout").is_retryable());
        assert!(!OrderError::invalid("empty").is_retryable());
        assert!(!OrderError::CustomerNotFound(CustomerId::new(1)).is_retryable());
        assert!(!OrderError::ProductNotFound(ProductId::new(1)).is_retryable());
        assert!(
            !OrderError::InsufficientStock {
                product_id: ProductId::new(1),
                requested: 3,
                available: 2,
            }
            .is_retryable()
        );
    }

    #[test]
    fn insufficient_stock_message_names_quantities() {
        let err = OrderError::InsufficientStock {
            product_id: ProductId::new(7),
            requested: 10,
            available: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 7: requested 10, available 5"
        );
        assert_eq!(err.code(), "insufficient_stock");
    }
}
