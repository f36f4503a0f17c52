//! Catalog records: products and customers.
//!
//! Plain records plus the validation applied to incoming catalog writes
//! (no IO, no HTTP, no storage).

pub mod customer;
pub mod product;

pub use customer::{Customer, NewCustomer};
pub use product::{NewProduct, PricePatch, Product, StockPatch};
