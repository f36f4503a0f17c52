use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use storefront_catalog::NewCustomer;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_customers).post(create_customer))
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list_customers().await {
        Ok(customers) => {
            Json(customers.iter().map(dto::customer_to_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> axum::response::Response {
    let request = match dto::body(payload) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.catalog.create_customer(request).await {
        Ok(customer) => {
            (StatusCode::CREATED, Json(dto::customer_to_json(&customer))).into_response()
        }
        Err(e) => errors::catalog_error_to_response(e),
    }
}
