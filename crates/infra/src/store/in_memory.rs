use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use storefront_catalog::{Customer, NewCustomer, NewProduct, Product};
use storefront_core::{CustomerId, Money, OrderId, OrderLineId, ProductId};
use storefront_orders::{Order, OrderLine};

use super::r#trait::{
    CatalogRepository, OrderHeader, ProductSnapshot, Store, StoreError, UnitOfWork,
};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    customers: BTreeMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, Order>,
    last_product_id: i64,
    last_customer_id: i64,
    last_order_id: i64,
    last_line_id: i64,
}

impl Tables {
    fn next_product_id(&mut self) -> ProductId {
        self.last_product_id += 1;
        ProductId::new(self.last_product_id)
    }

    fn next_customer_id(&mut self) -> CustomerId {
        self.last_customer_id += 1;
        CustomerId::new(self.last_customer_id)
    }

    // Ids are handed out like database sequences: a rolled-back order still
    // consumes its ids.
    fn next_order_id(&mut self) -> OrderId {
        self.last_order_id += 1;
        OrderId::new(self.last_order_id)
    }

    fn next_line_id(&mut self) -> OrderLineId {
        self.last_line_id += 1;
        OrderLineId::new(self.last_line_id)
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<ProductId, Arc<RowLock<()>>>>,
    unavailable: AtomicBool,
    fail_commits: AtomicBool,
}

impl Shared {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn row_locks(&self) -> Result<MutexGuard<'_, HashMap<ProductId, Arc<RowLock<()>>>>, StoreError> {
        self.row_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    /// Lock handle for an existing product; `None` if there is no such row.
    ///
    /// Products are never deleted, so the lock table stays bounded by the
    /// product table.
    fn row_lock(&self, product_id: ProductId) -> Result<Option<Arc<RowLock<()>>>, StoreError> {
        if !self.tables()?.products.contains_key(&product_id) {
            return Ok(None);
        }
        Ok(Some(self.row_locks()?.entry(product_id).or_default().clone()))
    }

    async fn lock_row(
        &self,
        product_id: ProductId,
    ) -> Result<Option<OwnedMutexGuard<()>>, StoreError> {
        match self.row_lock(product_id)? {
            Some(lock) => Ok(Some(lock.lock_owned().await)),
            None => Ok(None),
        }
    }
}

/// In-memory catalog + order ledger.
///
/// Intended for tests/dev. Gives the same guarantees the reservation engine
/// relies on from Postgres:
/// - product rows carry exclusive locks held until the unit of work ends;
/// - unit-of-work writes are staged and applied atomically on commit;
/// - dropping an uncommitted unit of work discards its writes.
///
/// Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline, every operation fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.shared.unavailable.store(offline, Ordering::SeqCst);
    }

    /// Make every subsequent commit fail (the unit of work is rolled back).
    pub fn set_fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of committed order lines across all orders.
    pub fn order_line_count(&self) -> Result<usize, StoreError> {
        let tables = self.shared.tables()?;
        Ok(tables.orders.values().map(|o| o.lines.len()).sum())
    }

    #[cfg(test)]
    pub(crate) fn row_lock_count(&self) -> usize {
        self.shared.row_locks().map(|locks| locks.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        self.shared.ensure_available()?;
        Ok(Box::new(InMemoryUnitOfWork {
            shared: self.shared.clone(),
            held_rows: HashMap::new(),
            staged_decrements: HashMap::new(),
            staged_order: None,
            committed: false,
        }))
    }
}

/// Unit of work over [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    shared: Arc<Shared>,
    held_rows: HashMap<ProductId, OwnedMutexGuard<()>>,
    staged_decrements: HashMap<ProductId, i64>,
    staged_order: Option<Order>,
    committed: bool,
}

impl InMemoryUnitOfWork {
    /// Take the row lock once per unit of work. `false` if the product does not exist.
    async fn hold_row(&mut self, product_id: ProductId) -> Result<bool, StoreError> {
        if self.held_rows.contains_key(&product_id) {
            return Ok(true);
        }
        match self.shared.lock_row(product_id).await? {
            Some(guard) => {
                self.held_rows.insert(product_id, guard);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn staged_decrement(&self, product_id: ProductId) -> i64 {
        self.staged_decrements.get(&product_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn customer_exists(&mut self, customer_id: CustomerId) -> Result<bool, StoreError> {
        self.shared.ensure_available()?;
        Ok(self.shared.tables()?.customers.contains_key(&customer_id))
    }

    async fn lock_and_read_product(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        self.shared.ensure_available()?;
        if !self.hold_row(product_id).await? {
            return Ok(None);
        }

        let pending = self.staged_decrement(product_id);
        let tables = self.shared.tables()?;
        Ok(tables.products.get(&product_id).map(|p| ProductSnapshot {
            price: p.price,
            stock: p.stock - pending,
        }))
    }

    async fn decrement_product_stock(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        self.shared.ensure_available()?;
        if !self.hold_row(product_id).await? {
            return Err(StoreError::NotFound);
        }

        let pending = self.staged_decrement(product_id);
        let stock = {
            let tables = self.shared.tables()?;
            tables
                .products
                .get(&product_id)
                .map(|p| p.stock)
                .ok_or(StoreError::NotFound)?
        };
        if stock - pending - quantity < 0 {
            return Err(StoreError::Constraint(format!(
                "stock of product {product_id} would become negative"
            )));
        }
        *self.staged_decrements.entry(product_id).or_insert(0) += quantity;
        Ok(())
    }

    async fn create_order_header(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<OrderHeader, StoreError> {
        self.shared.ensure_available()?;
        if self.staged_order.is_some() {
            return Err(StoreError::Constraint(
                "unit of work already created an order".to_string(),
            ));
        }
        let id = self.shared.tables()?.next_order_id();
        let header = OrderHeader {
            id,
            created_at: Utc::now(),
        };
        self.staged_order = Some(Order {
            id,
            customer_id,
            created_at: header.created_at,
            lines: Vec::new(),
        });
        Ok(header)
    }

    async fn append_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        price_each: Money,
    ) -> Result<OrderLineId, StoreError> {
        self.shared.ensure_available()?;
        if quantity <= 0 {
            return Err(StoreError::Constraint("qty must be positive".to_string()));
        }
        let line_id = {
            let mut tables = self.shared.tables()?;
            if !tables.products.contains_key(&product_id) {
                return Err(StoreError::Constraint(format!(
                    "order line references unknown product {product_id}"
                )));
            }
            tables.next_line_id()
        };
        let order = self
            .staged_order
            .as_mut()
            .filter(|o| o.id == order_id)
            .ok_or_else(|| {
                StoreError::Constraint(format!("order {order_id} is not part of this unit of work"))
            })?;
        order.lines.push(OrderLine {
            id: line_id,
            order_id,
            product_id,
            quantity,
            price_each,
        });
        Ok(line_id)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.shared.ensure_available()?;
        if self.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }

        {
            let mut tables = self.shared.tables()?;

            // Validate everything before touching anything so the apply step cannot fail halfway.
            for (product_id, quantity) in &self.staged_decrements {
                let product = tables.products.get(product_id).ok_or(StoreError::NotFound)?;
                if product.stock - quantity < 0 {
                    return Err(StoreError::Constraint(format!(
                        "stock of product {product_id} would become negative"
                    )));
                }
            }
            if let Some(order) = &self.staged_order {
                if !tables.customers.contains_key(&order.customer_id) {
                    return Err(StoreError::Constraint(format!(
                        "order references unknown customer {}",
                        order.customer_id
                    )));
                }
            }

            for (product_id, quantity) in self.staged_decrements.drain() {
                if let Some(product) = tables.products.get_mut(&product_id) {
                    product.stock -= quantity;
                }
            }
            if let Some(order) = self.staged_order.take() {
                tables.orders.insert(order.id, order);
            }
        }

        self.committed = true;
        // Row locks are released when `self` drops here.
        Ok(())
    }
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(
                locked_rows = self.held_rows.len(),
                "in-memory unit of work rolled back"
            );
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        self.shared.ensure_available()?;
        Ok(self.shared.tables()?.products.values().cloned().collect())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        self.shared.ensure_available()?;
        Ok(self.shared.tables()?.products.get(&product_id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.shared.ensure_available()?;
        if product.stock < 0 {
            return Err(StoreError::Constraint("stock must be >= 0".to_string()));
        }
        let mut tables = self.shared.tables()?;
        let id = tables.next_product_id();
        let created = Product {
            id,
            name: product.name,
            price: product.price,
            stock: product.stock,
            created_at: Utc::now(),
        };
        tables.products.insert(id, created.clone());
        Ok(created)
    }

    async fn patch_stock(&self, product_id: ProductId, stock: i64) -> Result<Product, StoreError> {
        self.shared.ensure_available()?;
        if stock < 0 {
            return Err(StoreError::Constraint("stock must be >= 0".to_string()));
        }
        // Same row lock as reservations: wait for any in-flight order on this product.
        let _row = self
            .shared
            .lock_row(product_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut tables = self.shared.tables()?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::NotFound)?;
        product.stock = stock;
        Ok(product.clone())
    }

    async fn update_price(
        &self,
        product_id: ProductId,
        price: Money,
    ) -> Result<Product, StoreError> {
        self.shared.ensure_available()?;
        let _row = self
            .shared
            .lock_row(product_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut tables = self.shared.tables()?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::NotFound)?;
        product.price = price;
        Ok(product.clone())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.shared.ensure_available()?;
        Ok(self.shared.tables()?.customers.values().cloned().collect())
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        self.shared.ensure_available()?;
        let mut tables = self.shared.tables()?;
        let id = tables.next_customer_id();
        let created = Customer {
            id,
            name: customer.name,
            phone: customer.phone,
            created_at: Utc::now(),
        };
        tables.customers.insert(id, created.clone());
        Ok(created)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.shared.ensure_available()?;
        Ok(self.shared.tables()?.orders.values().cloned().collect())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        self.shared.ensure_available()?;
        Ok(self.shared.tables()?.orders.get(&order_id).cloned())
    }
}
