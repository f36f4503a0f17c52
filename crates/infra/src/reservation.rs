//! Order creation: validate, reserve stock under row locks, record the order.
//!
//! ```text
//! CreateOrder
//!   ↓
//! 1. validate_create_order (no store access)
//!   ↓
//! 2. begin unit of work
//!   ↓
//! 3. customer must exist
//!   ↓
//! 4. create order header
//!   ↓
//! 5. lock every distinct product, ascending id
//!   ↓
//! 6. per line, in request order: check stock, decrement, append line
//!   ↓
//! 7. commit
//! ```
//!
//! Any rejection between 2 and 7 drops the unit of work, which rolls back
//! every write and releases every lock. Steps 2 to 7 share one deadline; when
//! it expires the in-flight future is dropped, and with it the unit of work.
//!
//! Locks are always acquired in ascending product id order, so two orders
//! touching overlapping products can never wait on each other in a cycle.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::instrument;

use storefront_core::ProductId;
use storefront_orders::{validate_create_order, CreateOrder, Order, OrderError, OrderLine};

use crate::store::{ProductSnapshot, Store, StoreError, UnitOfWork};

pub const DEFAULT_ORDER_TIMEOUT: Duration = Duration::from_secs(5);

impl From<StoreError> for OrderError {
    fn from(value: StoreError) -> Self {
        OrderError::StoreUnavailable(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationConfig {
    /// Upper bound on one whole order attempt, from begin through commit.
    pub timeout: Duration,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ORDER_TIMEOUT,
        }
    }
}

/// Creates orders atomically against a [`Store`].
///
/// Either the full order (header, every line, every stock decrement) is
/// committed, or nothing is. Stateless apart from the store handle, so one
/// instance can serve any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct OrderService<S> {
    store: S,
    config: ReservationConfig,
}

impl<S> OrderService<S>
where
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, ReservationConfig::default())
    }

    pub fn with_config(store: S, config: ReservationConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> ReservationConfig {
        self.config
    }

    /// Create an order, returning it fully materialized (ids, timestamp, frozen prices).
    #[instrument(
        skip(self, request),
        fields(customer_id = %request.customer_id, line_count = request.lines.len())
    )]
    pub async fn create_order(&self, request: CreateOrder) -> Result<Order, OrderError> {
        validate_create_order(&request)?;

        let outcome = self.run(&request).await;
        match &outcome {
            Ok(order) => tracing::info!(order_id = %order.id, "order committed"),
            Err(err) if err.is_retryable() => {
                tracing::error!(code = err.code(), error = %err, "order failed")
            }
            Err(err) => tracing::warn!(code = err.code(), error = %err, "order rejected"),
        }
        outcome
    }

    async fn run(&self, request: &CreateOrder) -> Result<Order, OrderError> {
        let attempt = async {
            let (uow, order) = self.stage(request).await?;
            uow.commit().await?;
            Ok::<_, OrderError>(order)
        };
        match tokio::time::timeout(self.config.timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => Err(OrderError::unavailable(format!(
                "order timed out after {} ms",
                self.config.timeout.as_millis()
            ))),
        }
    }

    /// Steps 2 to 6. On `Err` the unit of work has already been dropped.
    async fn stage(
        &self,
        request: &CreateOrder,
    ) -> Result<(Box<dyn UnitOfWork>, Order), OrderError> {
        let mut uow = self.store.begin().await?;

        if !uow.customer_exists(request.customer_id).await? {
            return Err(OrderError::CustomerNotFound(request.customer_id));
        }

        let header = uow.create_order_header(request.customer_id).await?;

        let mut remaining = lock_products(uow.as_mut(), request).await?;

        let mut lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let snapshot = remaining
                .get_mut(&line.product_id)
                .and_then(Option::as_mut)
                .ok_or(OrderError::ProductNotFound(line.product_id))?;

            if snapshot.stock < line.quantity {
                return Err(OrderError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: snapshot.stock,
                });
            }

            uow.decrement_product_stock(line.product_id, line.quantity)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound => OrderError::ProductNotFound(line.product_id),
                    other => other.into(),
                })?;
            snapshot.stock -= line.quantity;

            let line_id = uow
                .append_order_line(header.id, line.product_id, line.quantity, snapshot.price)
                .await?;
            lines.push(OrderLine {
                id: line_id,
                order_id: header.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price_each: snapshot.price,
            });
        }

        let order = Order {
            id: header.id,
            customer_id: request.customer_id,
            created_at: header.created_at,
            lines,
        };
        Ok((uow, order))
    }
}

/// Lock each distinct product once, in ascending id order.
///
/// Missing products map to `None`; the caller reports them in line order.
async fn lock_products(
    uow: &mut dyn UnitOfWork,
    request: &CreateOrder,
) -> Result<BTreeMap<ProductId, Option<ProductSnapshot>>, StoreError> {
    let mut products: BTreeMap<ProductId, Option<ProductSnapshot>> = request
        .lines
        .iter()
        .map(|line| (line.product_id, None))
        .collect();

    for (product_id, slot) in products.iter_mut() {
        *slot = uow.lock_and_read_product(*product_id).await?;
    }
    Ok(products)
}
