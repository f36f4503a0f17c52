use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use storefront_catalog::{NewCustomer, NewProduct};
use storefront_core::{CustomerId, Money, ProductId};
use storefront_infra::{CatalogRepository, InMemoryStore, OrderService};
use storefront_orders::{CreateOrder, OrderLineRequest};

/// Store seeded with one customer and `products` products with effectively unlimited stock.
fn seeded(rt: &Runtime, products: usize) -> (InMemoryStore, CustomerId, Vec<ProductId>) {
    rt.block_on(async {
        let store = InMemoryStore::new();
        let customer = store
            .create_customer(NewCustomer {
                name: "bench".to_string(),
                phone: None,
            })
            .await
            .unwrap();
        let mut ids = Vec::with_capacity(products);
        for i in 0..products {
            let product = store
                .create_product(NewProduct {
                    name: format!("item-{i}"),
                    price: Money::from_cents(199).unwrap(),
                    stock: i64::MAX / 2,
                })
                .await
                .unwrap();
            ids.push(product.id);
        }
        (store, customer.id, ids)
    })
}

fn bench_order_latency_by_line_count(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("create_order_latency");

    for lines in [1usize, 5, 25].iter() {
        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::new("lines", lines), lines, |b, &lines| {
            let (store, customer, ids) = seeded(&rt, lines);
            let service = OrderService::new(store);
            let request = CreateOrder::new(
                customer,
                ids.iter().map(|&id| OrderLineRequest::new(id, 1)).collect(),
            );

            b.to_async(&rt).iter(|| async {
                black_box(service.create_order(request.clone()).await.unwrap());
            });
        });
    }

    group.finish();
}

fn bench_contended_single_product(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("contended_orders");

    for concurrency in [1usize, 8, 32].iter() {
        group.throughput(Throughput::Elements(*concurrency as u64));
        group.bench_with_input(
            BenchmarkId::new("concurrent_orders", concurrency),
            concurrency,
            |b, &concurrency| {
                let (store, customer, ids) = seeded(&rt, 1);
                let service = OrderService::new(store);
                let request = CreateOrder::new(customer, vec![OrderLineRequest::new(ids[0], 1)]);

                b.to_async(&rt).iter(|| async {
                    let handles: Vec<_> = (0..concurrency)
                        .map(|_| {
                            let service = service.clone();
                            let request = request.clone();
                            tokio::spawn(async move { service.create_order(request).await })
                        })
                        .collect();
                    for handle in handles {
                        black_box(handle.await.unwrap().unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_rejected_order(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (store, customer, ids) = seeded(&rt, 2);
    let service = OrderService::new(store);
    // Second line references a missing product, so every attempt rolls back.
    let request = CreateOrder::new(
        customer,
        vec![
            OrderLineRequest::new(ids[0], 1),
            OrderLineRequest::new(ProductId::new(9_999), 1),
        ],
    );

    c.bench_function("rejected_order_rollback", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(service.create_order(request.clone()).await.unwrap_err());
        });
    });
}

criterion_group!(
    benches,
    bench_order_latency_by_line_count,
    bench_contended_single_product,
    bench_rejected_order
);
criterion_main!(benches);
