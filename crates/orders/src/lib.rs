//! Orders domain module.
//!
//! Order and order-line records, the typed order-creation request, its
//! structural validation, and the failure taxonomy of order creation. The
//! transaction that turns a request into a committed order lives in
//! `storefront-infra` (it needs the store).

pub mod error;
pub mod order;
pub mod validation;

pub use error::OrderError;
pub use order::{CreateOrder, Order, OrderLine, OrderLineRequest};
pub use validation::validate_create_order;
