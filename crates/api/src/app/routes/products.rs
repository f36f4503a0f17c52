use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use storefront_catalog::{NewProduct, PricePatch, StockPatch};
use storefront_core::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product))
        .route("/:id/stock", patch(patch_stock))
        .route("/:id/price", patch(update_price))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list_products().await {
        Ok(products) => {
            Json(products.iter().map(dto::product_to_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match dto::path_id(&id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.catalog.get_product(product_id).await {
        Ok(product) => Json(dto::product_to_json(&product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> axum::response::Response {
    let request = match dto::body(payload) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.catalog.create_product(request).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn patch_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<StockPatch>, JsonRejection>,
) -> axum::response::Response {
    let product_id: ProductId = match dto::path_id(&id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let patch = match dto::body(payload) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.catalog.patch_stock(product_id, patch).await {
        Ok(product) => Json(dto::product_to_json(&product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_price(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<PricePatch>, JsonRejection>,
) -> axum::response::Response {
    let product_id: ProductId = match dto::path_id(&id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let patch = match dto::body(payload) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.catalog.update_price(product_id, patch).await {
        Ok(product) => Json(dto::product_to_json(&product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
