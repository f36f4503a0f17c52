//! Configuration loading and representation.
//!
//! Everything comes from process environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` (fallback `DB_DSN`) | unset | Postgres connection string |
//! | `USE_PERSISTENT_STORES` | `true` iff a URL is set | `false` forces in-memory stores |
//! | `SERVER_ADDR` | `0.0.0.0:8080` | listen address (`:8080` means all interfaces) |
//! | `MIGRATIONS_DIR` | `migrations` | directory of `*.sql` migration files |
//! | `DB_MAX_CONNECTIONS` | `10` | pool size |
//! | `DB_MIN_CONNECTIONS` | `5` | idle connections kept open |
//! | `DB_MAX_LIFETIME_SECS` | `1800` | connection recycle age |
//! | `ORDER_TIMEOUT_MS` | `5000` | deadline for one order attempt |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::reservation::{ReservationConfig, DEFAULT_ORDER_TIMEOUT};

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("USE_PERSISTENT_STORES=true requires DATABASE_URL (or DB_DSN)")]
    MissingDatabaseUrl,
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
}

/// Backing store for the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres(DatabaseConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_addr: SocketAddr,
    pub store: StoreBackend,
    pub migrations_dir: PathBuf,
    pub reservation: ReservationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let server_addr = match get("SERVER_ADDR") {
            Some(raw) => parse_listen_addr(&raw)?,
            None => parse_listen_addr(DEFAULT_SERVER_ADDR)?,
        };

        let url = get("DATABASE_URL").or_else(|| get("DB_DSN"));
        let persistent = match get("USE_PERSISTENT_STORES") {
            Some(raw) => parse_var::<bool>("USE_PERSISTENT_STORES", &raw)?,
            None => url.is_some(),
        };

        let store = if persistent {
            let url = url.ok_or(ConfigError::MissingDatabaseUrl)?;
            StoreBackend::Postgres(DatabaseConfig {
                url,
                max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 10)?,
                min_connections: parse_or("DB_MIN_CONNECTIONS", get("DB_MIN_CONNECTIONS"), 5)?,
                max_lifetime: Duration::from_secs(parse_or(
                    "DB_MAX_LIFETIME_SECS",
                    get("DB_MAX_LIFETIME_SECS"),
                    1800,
                )?),
            })
        } else {
            StoreBackend::InMemory
        };

        let timeout_ms: u64 = parse_or(
            "ORDER_TIMEOUT_MS",
            get("ORDER_TIMEOUT_MS"),
            DEFAULT_ORDER_TIMEOUT.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "ORDER_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            server_addr,
            store,
            migrations_dir: get("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("migrations")),
            reservation: ReservationConfig {
                timeout: Duration::from_millis(timeout_ms),
            },
        })
    }
}

/// Accepts `host:port` and the bare `:port` form (all interfaces).
fn parse_listen_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    };
    parse_var("SERVER_ADDR", &candidate)
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_var(name, &raw),
        None => Ok(default),
    }
}
