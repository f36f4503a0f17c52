//! Integration tests for the order pipeline.
//!
//! Tests: CreateOrder → OrderService → Store (unit of work) → CatalogRepository reads
//!
//! Verifies:
//! - Rejected orders leave stock and the order ledger untouched
//! - Concurrent orders never oversell
//! - Recorded prices are frozen at sale time
//! - Line order is preserved
//! - Timeouts and commit failures roll back in full

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;

    use storefront_catalog::{NewCustomer, NewProduct, PricePatch, Product, StockPatch};
    use storefront_core::{CustomerId, Money, ProductId};
    use storefront_orders::{CreateOrder, Order, OrderError, OrderLineRequest};

    use crate::catalog::CatalogService;
    use crate::reservation::{OrderService, ReservationConfig};
    use crate::store::{CatalogRepository, InMemoryStore, Store};

    struct Fixture {
        store: InMemoryStore,
        orders: OrderService<InMemoryStore>,
        catalog: CatalogService<InMemoryStore>,
        customer: CustomerId,
    }

    async fn fixture() -> Fixture {
        fixture_with(ReservationConfig::default()).await
    }

    async fn fixture_with(config: ReservationConfig) -> Fixture {
        let store = InMemoryStore::new();
        let catalog = CatalogService::new(store.clone());
        let customer = catalog
            .create_customer(NewCustomer {
                name: "C1".to_string(),
                phone: Some("555-0100".to_string()),
            })
            .await
            .unwrap();
        Fixture {
            orders: OrderService::with_config(store.clone(), config),
            catalog,
            store,
            customer: customer.id,
        }
    }

    impl Fixture {
        async fn product(&self, price: &str, stock: i64) -> ProductId {
            self.catalog
                .create_product(NewProduct {
                    name: format!("product {price}"),
                    price: price.parse().unwrap(),
                    stock,
                })
                .await
                .unwrap()
                .id
        }

        async fn stock_of(&self, product_id: ProductId) -> i64 {
            self.catalog.get_product(product_id).await.unwrap().stock
        }

        async fn snapshot(&self) -> (Vec<Product>, Vec<Order>) {
            (
                self.store.list_products().await.unwrap(),
                self.store.list_orders().await.unwrap(),
            )
        }

        fn order(&self, lines: &[(ProductId, i64)]) -> CreateOrder {
            order_for(self.customer, lines)
        }
    }

    fn order_for(customer: CustomerId, lines: &[(ProductId, i64)]) -> CreateOrder {
        CreateOrder::new(
            customer,
            lines
                .iter()
                .map(|&(p, q)| OrderLineRequest::new(p, q))
                .collect(),
        )
    }

    #[tokio::test]
    async fn successful_order_decrements_stock_and_records_price() {
        let fx = fixture().await;
        let p1 = fx.product("10.00", 5).await;

        let order = fx.orders.create_order(fx.order(&[(p1, 3)])).await.unwrap();

        assert!(order.id.is_valid());
        assert_eq!(order.customer_id, fx.customer);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].product_id, p1);
        assert_eq!(order.lines[0].quantity, 3);
        assert_eq!(order.lines[0].price_each.to_string(), "10.00");
        assert_eq!(fx.stock_of(p1).await, 2);

        // The returned order is exactly what was persisted.
        assert_eq!(fx.catalog.get_order(order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_everything_unchanged() {
        let fx = fixture().await;
        let p1 = fx.product("10.00", 5).await;
        let before = fx.snapshot().await;

        let err = fx.orders.create_order(fx.order(&[(p1, 10)])).await.unwrap_err();

        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: p1,
                requested: 10,
                available: 5,
            }
        );
        assert_eq!(fx.snapshot().await, before);
    }

    #[tokio::test]
    async fn missing_product_rolls_back_earlier_lines() {
        let fx = fixture().await;
        let p1 = fx.product("10.00", 5).await;
        let before = fx.snapshot().await;

        let err = fx
            .orders
            .create_order(fx.order(&[(p1, 2), (ProductId::new(999), 1)]))
            .await
            .unwrap_err();

        assert_eq!(err, OrderError::ProductNotFound(ProductId::new(999)));
        assert_eq!(fx.stock_of(p1).await, 5);
        assert_eq!(fx.snapshot().await, before);
        assert_eq!(fx.store.order_line_count().unwrap(), 0);
        // Only the existing product ever got a row lock.
        assert_eq!(fx.store.row_lock_count(), 1);
    }

    #[tokio::test]
    async fn unknown_customer_is_rejected_without_writes() {
        let fx = fixture().await;
        let p1 = fx.product("1.00", 5).await;
        let before = fx.snapshot().await;

        let err = fx
            .orders
            .create_order(order_for(CustomerId::new(77), &[(p1, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err, OrderError::CustomerNotFound(CustomerId::new(77)));
        assert_eq!(fx.snapshot().await, before);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_store() {
        let fx = fixture().await;
        // An offline store would fail with StoreUnavailable if it were touched.
        fx.store.set_offline(true);

        let err = fx.orders.create_order(fx.order(&[])).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(_)));

        let err = fx
            .orders
            .create_order(fx.order(&[(ProductId::new(1), 0)]))
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::invalid("line 0: quantity must be positive"));
    }

    #[tokio::test]
    async fn duplicate_lines_draw_from_the_same_stock() {
        let fx = fixture().await;
        let p1 = fx.product("2.50", 5).await;

        let err = fx
            .orders
            .create_order(fx.order(&[(p1, 3), (p1, 3)]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: p1,
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(fx.stock_of(p1).await, 5);

        let order = fx
            .orders
            .create_order(fx.order(&[(p1, 3), (p1, 2)]))
            .await
            .unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.quantity_of(p1), 5);
        assert_eq!(fx.stock_of(p1).await, 0);
    }

    #[tokio::test]
    async fn exact_stock_can_be_sold_out() {
        let fx = fixture().await;
        let p1 = fx.product("1.00", 4).await;

        fx.orders.create_order(fx.order(&[(p1, 4)])).await.unwrap();
        assert_eq!(fx.stock_of(p1).await, 0);

        let err = fx.orders.create_order(fx.order(&[(p1, 1)])).await.unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { available: 0, .. }));
    }

    #[tokio::test]
    async fn recorded_prices_are_frozen() {
        let fx = fixture().await;
        let p1 = fx.product("10.00", 5).await;

        let order = fx.orders.create_order(fx.order(&[(p1, 1)])).await.unwrap();
        fx.catalog
            .update_price(
                p1,
                PricePatch {
                    price: "12.50".parse().unwrap(),
                },
            )
            .await
            .unwrap();

        let stored = fx.catalog.get_order(order.id).await.unwrap();
        assert_eq!(stored.lines[0].price_each, Money::from_cents(1000).unwrap());

        let next = fx.orders.create_order(fx.order(&[(p1, 1)])).await.unwrap();
        assert_eq!(next.lines[0].price_each, Money::from_cents(1250).unwrap());
    }

    #[tokio::test]
    async fn line_order_matches_request() {
        let fx = fixture().await;
        let a = fx.product("1.00", 10).await;
        let b = fx.product("2.00", 10).await;
        let c = fx.product("3.00", 10).await;

        let order = fx
            .orders
            .create_order(fx.order(&[(c, 1), (a, 2), (c, 1), (b, 3)]))
            .await
            .unwrap();

        let seen: Vec<_> = order.lines.iter().map(|l| (l.product_id, l.quantity)).collect();
        assert_eq!(seen, vec![(c, 1), (a, 2), (c, 1), (b, 3)]);
        assert_eq!(order.total().unwrap(), "14.00".parse::<Money>().unwrap());

        let stored = fx.catalog.get_order(order.id).await.unwrap();
        assert_eq!(stored.lines, order.lines);
    }

    #[tokio::test]
    async fn stock_patch_then_order() {
        let fx = fixture().await;
        let p1 = fx.product("1.00", 0).await;

        let err = fx.orders.create_order(fx.order(&[(p1, 1)])).await.unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { .. }));

        fx.catalog
            .patch_stock(p1, StockPatch { stock: 3 })
            .await
            .unwrap();
        fx.orders.create_order(fx.order(&[(p1, 3)])).await.unwrap();
        assert_eq!(fx.stock_of(p1).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_concurrent_orders_for_three_of_five() {
        let fx = Arc::new(fixture().await);
        let p1 = fx.product("10.00", 5).await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let fx = fx.clone();
                tokio::spawn(async move { fx.orders.create_order(fx.order(&[(p1, 3)])).await })
            })
            .collect();

        let mut ok = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(OrderError::InsufficientStock { available: 2, .. }) => short += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((ok, short), (1, 1));
        assert_eq!(fx.stock_of(p1).await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_oversell_under_contention() {
        let fx = Arc::new(fixture().await);
        let start = 17;
        let qty = 2;
        let p1 = fx.product("1.00", start).await;

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let fx = fx.clone();
                tokio::spawn(async move { fx.orders.create_order(fx.order(&[(p1, qty)])).await })
            })
            .collect();

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                committed += 1;
            }
        }

        assert!(committed <= start / qty);
        assert_eq!(committed, start / qty);
        assert_eq!(fx.stock_of(p1).await, start - committed * qty);

        let sold: i64 = fx
            .store
            .list_orders()
            .await
            .unwrap()
            .iter()
            .map(|o| o.quantity_of(p1))
            .sum();
        assert_eq!(sold, committed * qty);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn opposite_line_orders_do_not_deadlock() {
        let fx = Arc::new(
            fixture_with(ReservationConfig {
                timeout: Duration::from_secs(2),
            })
            .await,
        );
        let a = fx.product("1.00", 1_000).await;
        let b = fx.product("1.00", 1_000).await;

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let fx = fx.clone();
                let lines = if i % 2 == 0 { [(a, 1), (b, 1)] } else { [(b, 1), (a, 1)] };
                tokio::spawn(async move { fx.orders.create_order(fx.order(&lines)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(fx.stock_of(a).await, 950);
        assert_eq!(fx.stock_of(b).await, 950);
    }

    #[tokio::test]
    async fn timeout_rolls_back_and_is_retryable() {
        let fx = fixture_with(ReservationConfig {
            timeout: Duration::from_millis(50),
        })
        .await;
        let p1 = fx.product("1.00", 5).await;
        let p2 = fx.product("1.00", 5).await;
        let before = fx.snapshot().await;

        // Another unit of work holds p2's row lock for the whole attempt.
        let mut blocker = fx.store.begin().await.unwrap();
        blocker.lock_and_read_product(p2).await.unwrap();

        let err = fx
            .orders
            .create_order(fx.order(&[(p1, 1), (p2, 1)]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("timed out"));

        drop(blocker);
        assert_eq!(fx.snapshot().await, before);

        // p1's lock was released by the rollback: the next attempt goes through.
        fx.orders
            .create_order(fx.order(&[(p1, 1), (p2, 1)]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn commit_failure_is_retryable_and_leaves_no_trace() {
        let fx = fixture().await;
        let p1 = fx.product("1.00", 5).await;
        let before = fx.snapshot().await;

        fx.store.set_fail_commits(true);
        let err = fx.orders.create_order(fx.order(&[(p1, 2)])).await.unwrap_err();
        assert!(matches!(err, OrderError::StoreUnavailable(_)));
        assert_eq!(fx.snapshot().await, before);

        fx.store.set_fail_commits(false);
        fx.orders.create_order(fx.order(&[(p1, 2)])).await.unwrap();
        assert_eq!(fx.stock_of(p1).await, 3);
    }

    #[tokio::test]
    async fn patch_during_open_order_waits_for_it() {
        let fx = fixture().await;
        let p1 = fx.product("1.00", 5).await;

        let mut uow = fx.store.begin().await.unwrap();
        uow.lock_and_read_product(p1).await.unwrap();
        uow.decrement_product_stock(p1, 5).await.unwrap();

        let catalog = fx.catalog.clone();
        let patch = tokio::spawn(async move { catalog.patch_stock(p1, StockPatch { stock: 9 }).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!patch.is_finished());

        uow.commit().await.unwrap();
        assert_eq!(patch.await.unwrap().unwrap().stock, 9);
        assert_eq!(fx.stock_of(p1).await, 9);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: a rejected order changes nothing; an accepted one takes exactly its quantities.
        #[test]
        fn orders_are_all_or_nothing(
            stocks in prop::collection::vec(0i64..6, 1..4),
            lines in prop::collection::vec((0usize..5, 1i64..4), 1..5),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let fx = fixture().await;
                let mut ids = Vec::new();
                for &stock in &stocks {
                    ids.push(fx.product("3.00", stock).await);
                }
                // Indexes past the seeded products refer to missing ones.
                let request: Vec<_> = lines
                    .iter()
                    .map(|&(idx, qty)| {
                        let id = ids.get(idx).copied().unwrap_or(ProductId::new(1_000 + idx as i64));
                        (id, qty)
                    })
                    .collect();

                let before = fx.snapshot().await;
                let result = fx.orders.create_order(fx.order(&request)).await;
                let (products, orders) = fx.snapshot().await;

                match result {
                    Ok(order) => {
                        prop_assert_eq!(orders.len(), 1);
                        for (before, after) in before.0.iter().zip(&products) {
                            prop_assert!(after.stock >= 0);
                            prop_assert_eq!(before.stock - after.stock, order.quantity_of(after.id));
                        }
                    }
                    Err(err) => {
                        prop_assert!(!err.is_retryable());
                        prop_assert_eq!(&products, &before.0);
                        prop_assert_eq!(&orders, &before.1);
                    }
                }
                Ok(())
            })?;
        }
    }

    /// Same scenarios against a real database. Set `STOREFRONT_TEST_DATABASE_URL` to run.
    #[tokio::test]
    async fn postgres_store_scenarios() {
        let Ok(url) = std::env::var("STOREFRONT_TEST_DATABASE_URL") else {
            return;
        };
        let pool = sqlx::PgPool::connect(&url).await.unwrap();
        let migrations =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
        crate::migrations::run_migrations(&pool, &migrations)
            .await
            .unwrap();

        let store = crate::store::PostgresStore::new(pool);
        let catalog = CatalogService::new(store.clone());
        let orders = Arc::new(OrderService::new(store.clone()));

        let customer = catalog
            .create_customer(NewCustomer {
                name: "C1".to_string(),
                phone: None,
            })
            .await
            .unwrap()
            .id;
        let p1 = catalog
            .create_product(NewProduct {
                name: "P1".to_string(),
                price: "10.00".parse().unwrap(),
                stock: 5,
            })
            .await
            .unwrap()
            .id;

        let err = orders
            .create_order(order_for(customer, &[(p1, 2), (ProductId::new(i64::MAX), 1)]))
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::ProductNotFound(ProductId::new(i64::MAX)));
        assert_eq!(catalog.get_product(p1).await.unwrap().stock, 5);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let orders = orders.clone();
                tokio::spawn(async move {
                    orders.create_order(order_for(customer, &[(p1, 3)])).await
                })
            })
            .collect();
        let mut committed = Vec::new();
        for handle in handles {
            if let Ok(order) = handle.await.unwrap() {
                committed.push(order);
            }
        }
        assert_eq!(committed.len(), 1);
        assert_eq!(catalog.get_product(p1).await.unwrap().stock, 2);

        catalog
            .update_price(p1, PricePatch { price: "11.00".parse().unwrap() })
            .await
            .unwrap();
        let stored = catalog.get_order(committed[0].id).await.unwrap();
        assert_eq!(stored.lines[0].price_each.to_string(), "10.00");
    }
}
