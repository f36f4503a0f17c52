use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CustomerId, DomainError, DomainResult};

/// Customer record. Referenced by orders, never mutated by them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request: register a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewCustomer {
    /// Validate and normalize the request.
    ///
    /// A blank phone is stored as "no contact".
    pub fn validate(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok(Self { name, phone })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_required() {
        let err = NewCustomer {
            name: "".to_string(),
            phone: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, DomainError::validation("name is required"));
    }

    #[test]
    fn blank_phone_becomes_none() {
        let c = NewCustomer {
            name: "Ada".to_string(),
            phone: Some("  ".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(c.phone, None);
    }

    #[test]
    fn phone_is_optional_in_json() {
        let c: NewCustomer = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(c.phone, None);
    }
}
