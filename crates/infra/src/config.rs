//! Configuration loading and representation.
//!
//! All settings come from the environment and are read once at startup.
//! Unset variables fall back to local-development defaults; set-but-malformed
//! values are a startup error.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which ledger implementation the server runs against.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LedgerBackend {
    /// The networked immudb store at `host:port`.
    #[default]
    Immudb,
    /// Process-local ledger. Everything is lost on restart.
    Memory,
}

impl core::str::FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immudb" => Ok(LedgerBackend::Immudb),
            "memory" => Ok(LedgerBackend::Memory),
            other => Err(format!("unknown ledger backend {other:?} (expected immudb or memory)")),
        }
    }
}

/// Connection parameters for the ledger.
#[derive(Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            host: "localhost".to_string(),
            port: 3322,
            user: "immudb".to_string(),
            password: "immudb".to_string(),
            database: "defaultdb".to_string(),
        }
    }
}

impl core::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Stock computation knobs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockConfig {
    /// Versions replayed per SKU for balances, history and snapshots.
    ///
    /// This is a hard ceiling, not a cursor: a SKU with more versions than
    /// this replays only the most recent ones and yields a wrong balance.
    pub history_limit: usize,
    /// Versions scanned for point-in-time queries.
    pub time_travel_limit: usize,
    /// Overwrite `product:<sku>` with the new balance after each movement.
    pub mirror_product_balance: bool,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            time_travel_limit: 2500,
            mirror_product_balance: false,
        }
    }
}

/// HTTP server settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Shared secret expected in the `x-api-key` header.
    pub api_key: String,
}

impl core::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

pub const DEV_API_KEY: &str = "dev-api-key";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            api_key: DEV_API_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub stock: StockConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let ledger = LedgerConfig {
            backend: parse_or("LEDGER_BACKEND", get("LEDGER_BACKEND"), defaults.ledger.backend)?,
            host: get("IMMUDB_HOST").unwrap_or(defaults.ledger.host),
            port: parse_or("IMMUDB_PORT", get("IMMUDB_PORT"), defaults.ledger.port)?,
            user: get("IMMUDB_USER").unwrap_or(defaults.ledger.user),
            password: get("IMMUDB_PASS").unwrap_or(defaults.ledger.password),
            database: get("IMMUDB_DB").unwrap_or(defaults.ledger.database),
        };

        let stock = StockConfig {
            history_limit: positive(
                "LEDGER_HISTORY_LIMIT",
                get("LEDGER_HISTORY_LIMIT"),
                defaults.stock.history_limit,
            )?,
            time_travel_limit: positive(
                "LEDGER_TIME_TRAVEL_LIMIT",
                get("LEDGER_TIME_TRAVEL_LIMIT"),
                defaults.stock.time_travel_limit,
            )?,
            mirror_product_balance: parse_or(
                "STOCK_MIRROR_PRODUCT_BALANCE",
                get("STOCK_MIRROR_PRODUCT_BALANCE"),
                defaults.stock.mirror_product_balance,
            )?,
        };

        let api_key = match get("API_KEY_SECRET") {
            Some(key) => key,
            None => {
                tracing::warn!("API_KEY_SECRET not set; using insecure dev default");
                defaults.server.api_key
            }
        };

        let server = ServerConfig {
            port: parse_or("PORT", get("PORT"), defaults.server.port)?,
            api_key,
        };

        Ok(Self { ledger, stock, server })
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive(var: &'static str, raw: Option<String>, default: usize) -> Result<usize, ConfigError> {
    let value = parse_or(var, raw.clone(), default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: raw.unwrap_or_default(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.ledger.port, 3322);
        assert_eq!(cfg.stock.history_limit, 1000);
    }

    #[test]
    fn env_overrides_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("IMMUDB_HOST", "ledger.internal"),
            ("IMMUDB_PORT", "4000"),
            ("IMMUDB_DB", "inventory"),
            ("LEDGER_HISTORY_LIMIT", "50"),
            ("STOCK_MIRROR_PRODUCT_BALANCE", "true"),
            ("API_KEY_SECRET", "s3cret"),
            ("PORT", "8081"),
        ]))
        .unwrap();

        assert_eq!(cfg.ledger.host, "ledger.internal");
        assert_eq!(cfg.ledger.port, 4000);
        assert_eq!(cfg.ledger.database, "inventory");
        assert_eq!(cfg.stock.history_limit, 50);
        assert!(cfg.stock.mirror_product_balance);
        assert_eq!(cfg.server.api_key, "s3cret");
        assert_eq!(cfg.server.port, 8081);
    }

    #[test]
    fn ledger_backend_must_be_named() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.ledger.backend, LedgerBackend::Immudb);

        let cfg = AppConfig::from_lookup(lookup(&[("LEDGER_BACKEND", "Memory")])).unwrap();
        assert_eq!(cfg.ledger.backend, LedgerBackend::Memory);

        let err = AppConfig::from_lookup(lookup(&[("LEDGER_BACKEND", "sqlite")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "LEDGER_BACKEND", .. }));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("IMMUDB_PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "IMMUDB_PORT", .. }));

        let err = AppConfig::from_lookup(lookup(&[("LEDGER_HISTORY_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "LEDGER_HISTORY_LIMIT", .. }));
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let cfg = AppConfig::default();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains(DEV_API_KEY));
        assert!(printed.contains("<redacted>"));
    }
}
