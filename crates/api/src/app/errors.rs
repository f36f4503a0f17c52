use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;

use storefront_infra::CatalogError;
use storefront_orders::OrderError;

pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    let code = err.code();
    match err {
        OrderError::InvalidRequest(msg) => json_error(StatusCode::BAD_REQUEST, code, msg),
        OrderError::CustomerNotFound(_) | OrderError::ProductNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, code, err.to_string())
        }
        OrderError::InsufficientStock { .. } => json_error(StatusCode::CONFLICT, code, err.to_string()),
        OrderError::StoreUnavailable(_) => unavailable(code, err.to_string()),
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    let code = err.code();
    match err {
        CatalogError::InvalidRequest(msg) => json_error(StatusCode::BAD_REQUEST, code, msg),
        CatalogError::ProductNotFound(_) | CatalogError::OrderNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, code, err.to_string())
        }
        CatalogError::StoreUnavailable(_) => unavailable(code, err.to_string()),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 503 that tells the client the attempt had no effect and may be retried shortly.
fn unavailable(code: &'static str, message: String) -> axum::response::Response {
    tracing::error!(error = %message, "store unavailable");
    let mut response = json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        code,
        "the store is temporarily unavailable; nothing was changed, retry shortly",
    );
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    response
}
