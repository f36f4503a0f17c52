use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use storefront_catalog::{Customer, NewCustomer, NewProduct, Product};
use storefront_core::{CustomerId, Money, OrderId, OrderLineId, ProductId};
use storefront_orders::Order;

/// Store operation error.
///
/// These are **infrastructure errors** (connectivity, lock conflicts,
/// constraint checks) as opposed to business rejections, which the
/// reservation engine decides on from the values it reads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("row not found")]
    NotFound,

    /// The store cannot be reached or the operation could not complete.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store aborted the unit of work (deadlock, serialization failure).
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A database constraint rejected a write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A stored value could not be mapped back into a domain value.
    #[error("failed to decode stored value: {0}")]
    Decode(String),
}

/// Price and stock of a product as read under its row lock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub price: Money,
    pub stock: i64,
}

/// Identity of a freshly created (not yet committed) order header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderHeader {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
}

/// One all-or-nothing unit of work against the catalog and the order ledger.
///
/// Nothing written through a unit of work is visible to others until
/// [`UnitOfWork::commit`] succeeds. Dropping it without committing rolls
/// everything back and releases every row lock it holds, on every exit path
/// (early return, `?`, timeout cancellation, panic).
#[async_trait]
pub trait UnitOfWork: Send {
    async fn customer_exists(&mut self, customer_id: CustomerId) -> Result<bool, StoreError>;

    /// Take the exclusive row lock on a product and read its live price and stock.
    ///
    /// The lock is held until the unit of work ends. Returns `None` if the
    /// product does not exist.
    async fn lock_and_read_product(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError>;

    /// Subtract `quantity` from the product's stock (`NotFound` if the row is gone).
    async fn decrement_product_stock(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), StoreError>;

    async fn create_order_header(&mut self, customer_id: CustomerId)
    -> Result<OrderHeader, StoreError>;

    async fn append_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        price_each: Money,
    ) -> Result<OrderLineId, StoreError>;

    /// Make every write of this unit of work durable, atomically.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Factory for units of work (one per order attempt).
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        (**self).begin().await
    }
}

/// Catalog point operations and order reads.
///
/// Each call touches rows independently; none of them needs the reservation
/// locking discipline. `patch_stock` still waits for a reservation holding the
/// product's row lock.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Overwrite a product's stock (`NotFound` if the product does not exist).
    async fn patch_stock(&self, product_id: ProductId, stock: i64) -> Result<Product, StoreError>;

    /// Overwrite a product's unit price (`NotFound` if the product does not exist).
    ///
    /// Already recorded order lines keep the price they were sold at.
    async fn update_price(&self, product_id: ProductId, price: Money)
    -> Result<Product, StoreError>;

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError>;

    /// All orders by id, each with its lines in recorded order.
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;
}

#[async_trait]
impl<R> CatalogRepository for Arc<R>
where
    R: CatalogRepository + ?Sized,
{
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(product_id).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        (**self).create_product(product).await
    }

    async fn patch_stock(&self, product_id: ProductId, stock: i64) -> Result<Product, StoreError> {
        (**self).patch_stock(product_id, stock).await
    }

    async fn update_price(
        &self,
        product_id: ProductId,
        price: Money,
    ) -> Result<Product, StoreError> {
        (**self).update_price(product_id, price).await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        (**self).list_customers().await
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        (**self).create_customer(customer).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders().await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get_order(order_id).await
    }
}
