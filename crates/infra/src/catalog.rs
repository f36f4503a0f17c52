//! Catalog maintenance: products, customers, stock patches and order reads.

use thiserror::Error;
use tracing::instrument;

use storefront_catalog::{Customer, NewCustomer, NewProduct, PricePatch, Product, StockPatch};
use storefront_core::{DomainError, OrderId, ProductId};
use storefront_orders::Order;

use crate::store::{CatalogRepository, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ProductNotFound(_) => "product_not_found",
            Self::OrderNotFound(_) => "order_not_found",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        CatalogError::InvalidRequest(value.reason())
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Constraint(msg) => CatalogError::InvalidRequest(msg),
            other => CatalogError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Validating front for a [`CatalogRepository`].
#[derive(Debug, Clone)]
pub struct CatalogService<R> {
    repo: R,
}

impl<R> CatalogService<R>
where
    R: CatalogRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// All products, ordered by id.
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.repo.list_products().await?)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        self.repo
            .get_product(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound(product_id))
    }

    #[instrument(skip(self, request))]
    pub async fn create_product(&self, request: NewProduct) -> Result<Product, CatalogError> {
        let request = request.validate()?;
        let product = self.repo.create_product(request).await?;
        tracing::info!(product_id = %product.id, stock = product.stock, "product created");
        Ok(product)
    }

    /// Overwrite the stock level of one product.
    ///
    /// Waits for any in-flight order holding the product's row lock, so a
    /// patch never interleaves with a reservation's read-check-decrement.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn patch_stock(
        &self,
        product_id: ProductId,
        patch: StockPatch,
    ) -> Result<Product, CatalogError> {
        let patch = patch.validate()?;
        let product = self
            .repo
            .patch_stock(product_id, patch.stock)
            .await
            .map_err(|e| not_found_as_product(e, product_id))?;
        tracing::info!(stock = product.stock, "stock patched");
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_price(
        &self,
        product_id: ProductId,
        patch: PricePatch,
    ) -> Result<Product, CatalogError> {
        let product = self
            .repo
            .update_price(product_id, patch.price)
            .await
            .map_err(|e| not_found_as_product(e, product_id))?;
        tracing::info!(price = %product.price, "price updated");
        Ok(product)
    }

    /// All customers, ordered by id.
    pub async fn list_customers(&self) -> Result<Vec<Customer>, CatalogError> {
        Ok(self.repo.list_customers().await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create_customer(&self, request: NewCustomer) -> Result<Customer, CatalogError> {
        let request = request.validate()?;
        let customer = self.repo.create_customer(request).await?;
        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    /// All orders with their lines, ordered by id.
    pub async fn list_orders(&self) -> Result<Vec<Order>, CatalogError> {
        Ok(self.repo.list_orders().await?)
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, CatalogError> {
        self.repo
            .get_order(order_id)
            .await?
            .ok_or(CatalogError::OrderNotFound(order_id))
    }
}

fn not_found_as_product(err: StoreError, product_id: ProductId) -> CatalogError {
    match err {
        StoreError::NotFound => CatalogError::ProductNotFound(product_id),
        other => other.into(),
    }
}
