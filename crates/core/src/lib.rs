//! `storefront-core`: ids, money and the domain error model.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, OrderId, OrderLineId, ProductId};
pub use money::Money;
