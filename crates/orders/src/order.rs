use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CustomerId, DomainResult, Money, OrderId, OrderLineId, ProductId};

/// One requested line: which product, how many units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    #[serde(alias = "qty")]
    pub quantity: i64,
}

impl OrderLineRequest {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Request: create an order for `customer_id` consuming stock for `lines`.
///
/// The order of `lines` is the caller's presentation order and is preserved
/// into the committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub customer_id: CustomerId,
    #[serde(alias = "items")]
    pub lines: Vec<OrderLineRequest>,
}

impl CreateOrder {
    pub fn new(customer_id: CustomerId, lines: Vec<OrderLineRequest>) -> Self {
        Self { customer_id, lines }
    }
}

/// Committed order line.
///
/// `price_each` is the product price read under lock at the moment of sale.
/// Later price changes on the product do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price_each: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> DomainResult<Money> {
        self.price_each.times(self.quantity)
    }
}

/// Committed order: header plus its lines. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Sum of `price_each * quantity` over all lines.
    pub fn total(&self) -> DomainResult<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total()?))
    }

    pub fn quantity_of(&self, product_id: ProductId) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }
}
