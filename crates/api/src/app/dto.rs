//! Request extraction and JSON mapping helpers.
//!
//! Wire names follow the storefront's established JSON: order lines are
//! `items` with `qty`, money is a two-decimal string.

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use storefront_catalog::{Customer, Product};
use storefront_orders::{Order, OrderLine};

use crate::app::errors;

/// Unwrap a JSON body, turning any rejection (bad syntax, wrong shape,
/// missing content type) into a 400 `invalid_request`.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            rejection.body_text(),
        )
    })
}

/// Parse a numeric path id into its typed form.
pub fn path_id<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: FromStr,
{
    raw.parse::<T>().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            format!("invalid {what} id: {raw}"),
        )
    })
}

pub fn product_to_json(p: &Product) -> Value {
    json!({
        "id": p.id,
        "name": p.name,
        "price": p.price,
        "stock": p.stock,
        "created_at": p.created_at,
    })
}

pub fn customer_to_json(c: &Customer) -> Value {
    json!({
        "id": c.id,
        "name": c.name,
        "phone": c.phone,
        "created_at": c.created_at,
    })
}

fn order_line_to_json(l: &OrderLine) -> Value {
    json!({
        "id": l.id,
        "order_id": l.order_id,
        "product_id": l.product_id,
        "qty": l.quantity,
        "price_each": l.price_each,
    })
}

pub fn order_to_json(o: &Order) -> Value {
    json!({
        "id": o.id,
        "customer_id": o.customer_id,
        "created_at": o.created_at,
        "items": o.lines.iter().map(order_line_to_json).collect::<Vec<_>>(),
        "total": o.total().ok(),
    })
}
