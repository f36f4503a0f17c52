//! Thin HTTP client for the storefront API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HEALTH_TIMEOUT: Duration = Duration::from_millis(800);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body (`{"error", "message"}`).
    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub stock: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerView {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemView {
    pub product_id: i64,
    pub qty: i64,
    pub price_each: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderView {
    pub id: i64,
    pub customer_id: i64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    pub total: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub qty: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether `/health` answers 200 within a short timeout.
    pub async fn server_up(&self) -> bool {
        match self
            .http
            .get(self.url("/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(res) => res.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }

    pub async fn list_products(&self) -> Result<Vec<ProductView>, ClientError> {
        self.send(Method::GET, "/products", None).await
    }

    pub async fn create_product(
        &self,
        name: &str,
        price: &str,
        stock: i64,
    ) -> Result<ProductView, ClientError> {
        let body = serde_json::json!({ "name": name, "price": price, "stock": stock });
        self.send(Method::POST, "/products", Some(body)).await
    }

    pub async fn update_stock(&self, product_id: i64, stock: i64) -> Result<ProductView, ClientError> {
        let body = serde_json::json!({ "stock": stock });
        self.send(Method::PATCH, &format!("/products/{product_id}/stock"), Some(body))
            .await
    }

    pub async fn list_customers(&self) -> Result<Vec<CustomerView>, ClientError> {
        self.send(Method::GET, "/customers", None).await
    }

    pub async fn create_customer(&self, name: &str, phone: &str) -> Result<CustomerView, ClientError> {
        let body = serde_json::json!({ "name": name, "phone": phone });
        self.send(Method::POST, "/customers", Some(body)).await
    }

    pub async fn create_order(
        &self,
        customer_id: i64,
        items: &[NewOrderItem],
    ) -> Result<OrderView, ClientError> {
        let body = serde_json::json!({ "customer_id": customer_id, "items": items });
        self.send(Method::POST, "/orders", Some(body)).await
    }

    pub async fn list_orders(&self) -> Result<Vec<OrderView>, ClientError> {
        self.send(Method::GET, "/orders", None).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut req = self.http.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;

        let status = res.status();
        if status.is_success() {
            return Ok(res.json().await?);
        }

        let text = res.text().await.unwrap_or_default();
        Err(api_error(status, &text))
    }
}

fn api_error(status: StatusCode, text: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => ClientError::Api {
            status,
            code: body.error,
            message: body.message,
        },
        Err(_) => ClientError::Api {
            status,
            code: "unknown".to_string(),
            message: if text.is_empty() {
                status.to_string()
            } else {
                text.to_string()
            },
        },
    }
}
