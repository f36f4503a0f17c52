//! Postgres-backed catalog and order ledger.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (deadlock detected) | `40P01` | `Conflict` |
//! | Database (serialization failure) | `40001` | `Conflict` |
//! | Database (integrity constraint) | `23xxx` | `Constraint` |
//! | Database (data exception, e.g. numeric overflow) | `22xxx` | `Constraint` |
//! | Database (other) | Any other | `Unavailable` |
//! | RowNotFound | N/A | `NotFound` |
//! | ColumnDecode / Decode | N/A | `Decode` |
//! | PoolClosed / PoolTimedOut / Io / Tls / other | N/A | `Unavailable` |
//!
//! ## Locking
//!
//! Reservations take `SELECT ... FOR UPDATE` row locks on `products`; they are
//! held until the transaction commits or rolls back. `patch_stock` and
//! `update_price` are single `UPDATE` statements, which take the same row lock.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use storefront_catalog::{Customer, NewCustomer, NewProduct, Product};
use storefront_core::{CustomerId, Money, OrderId, OrderLineId, ProductId};
use storefront_orders::{Order, OrderLine};

use super::r#trait::{
    CatalogRepository, OrderHeader, ProductSnapshot, Store, StoreError, UnitOfWork,
};

/// Postgres store. Cheap to clone (the pool is reference counted).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

/// One database transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn customer_exists(&mut self, customer_id: CustomerId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM customers WHERE id = $1")
            .bind(customer_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("customer_exists", e))?;
        Ok(row.is_some())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn lock_and_read_product(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        let row = sqlx::query("SELECT price, stock FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;

        row.map(|row| {
            Ok(ProductSnapshot {
                price: money_column(&row, "price")?,
                stock: row
                    .try_get("stock")
                    .map_err(|e| map_sqlx_error("lock_product", e))?,
            })
        })
        .transpose()
    }

    async fn decrement_product_stock(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2")
            .bind(quantity)
            .bind(product_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_order_header(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<OrderHeader, StoreError> {
        let row = sqlx::query(
            "INSERT INTO orders (customer_id) VALUES ($1) RETURNING id, created_at",
        )
        .bind(customer_id.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("insert_order", e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(OrderHeader {
            id: OrderId::new(id),
            created_at,
        })
    }

    async fn append_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        price_each: Money,
    ) -> Result<OrderLineId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_items (order_id, product_id, qty, price_each)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(order_id.get())
        .bind(product_id.get())
        .bind(quantity)
        .bind(price_each.amount())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        Ok(OrderLineId::new(id))
    }

    #[instrument(skip(self), err)]
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, price, stock, created_at FROM products ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, price, stock, created_at FROM products WHERE id = $1",
        )
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(name = %product.name), err)]
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price, stock)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, stock, created_at
            "#,
        )
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        product_from_row(&row)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn patch_stock(&self, product_id: ProductId, stock: i64) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE products SET stock = $1
            WHERE id = $2
            RETURNING id, name, price, stock, created_at
            "#,
        )
        .bind(stock)
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("patch_stock", e))?;

        row.as_ref()
            .map(product_from_row)
            .transpose()?
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn update_price(
        &self,
        product_id: ProductId,
        price: Money,
    ) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE products SET price = $1
            WHERE id = $2
            RETURNING id, name, price, stock, created_at
            "#,
        )
        .bind(price.amount())
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_price", e))?;

        row.as_ref()
            .map(product_from_row)
            .transpose()?
            .ok_or(StoreError::NotFound)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query("SELECT id, name, phone, created_at FROM customers ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_customers", e))?;

        rows.iter().map(customer_from_row).collect()
    }

    #[instrument(skip(self, customer), err)]
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (name, phone)
            VALUES ($1, $2)
            RETURNING id, name, phone, created_at
            "#,
        )
        .bind(&customer.name)
        .bind(customer.phone.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_customer", e))?;

        customer_from_row(&row)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let headers = sqlx::query("SELECT id, customer_id, created_at FROM orders ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        let lines = sqlx::query(
            r#"
            SELECT id, order_id, product_id, qty, price_each
            FROM order_items
            ORDER BY order_id ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_order_items", e))?;

        let mut orders = BTreeMap::new();
        for row in &headers {
            let order = order_header_from_row(row)?;
            orders.insert(order.id, order);
        }
        for row in &lines {
            let line = order_line_from_row(row)?;
            if let Some(order) = orders.get_mut(&line.order_id) {
                order.lines.push(line);
            }
        }
        Ok(orders.into_values().collect())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let header = sqlx::query("SELECT id, customer_id, created_at FROM orders WHERE id = $1")
            .bind(order_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        let Some(header) = header else {
            return Ok(None);
        };

        let mut order = order_header_from_row(&header)?;
        let lines = sqlx::query(
            r#"
            SELECT id, order_id, product_id, qty, price_each
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order_items", e))?;

        order.lines = lines
            .iter()
            .map(order_line_from_row)
            .collect::<Result<_, _>>()?;
        Ok(Some(order))
    }
}

// Row mapping

fn money_column(row: &PgRow, column: &str) -> Result<Money, StoreError> {
    let amount: Decimal = row
        .try_get(column)
        .map_err(|e| map_sqlx_error("decode_money", e))?;
    Money::new(amount).map_err(|e| StoreError::Decode(format!("{column}: {e}")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let decode = |e| map_sqlx_error("decode_product", e);
    Ok(Product {
        id: ProductId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        price: money_column(row, "price")?,
        stock: row.try_get("stock").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn customer_from_row(row: &PgRow) -> Result<Customer, StoreError> {
    let decode = |e| map_sqlx_error("decode_customer", e);
    Ok(Customer {
        id: CustomerId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn order_header_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let decode = |e| map_sqlx_error("decode_order", e);
    Ok(Order {
        id: OrderId::new(row.try_get("id").map_err(decode)?),
        customer_id: CustomerId::new(row.try_get("customer_id").map_err(decode)?),
        created_at: row.try_get("created_at").map_err(decode)?,
        lines: Vec::new(),
    })
}

fn order_line_from_row(row: &PgRow) -> Result<OrderLine, StoreError> {
    let decode = |e| map_sqlx_error("decode_order_item", e);
    Ok(OrderLine {
        id: OrderLineId::new(row.try_get("id").map_err(decode)?),
        order_id: OrderId::new(row.try_get("order_id").map_err(decode)?),
        product_id: ProductId::new(row.try_get("product_id").map_err(decode)?),
        quantity: row.try_get("qty").map_err(decode)?,
        price_each: money_column(row, "price_each")?,
    })
}

/// Map SQLx errors to `StoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("40P01") | Some("40001") => StoreError::Conflict(msg),
                Some(code) if code.starts_with("23") || code.starts_with("22") => {
                    StoreError::Constraint(msg)
                }
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{} in {}", err, operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
