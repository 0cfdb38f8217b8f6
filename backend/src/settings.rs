//! Server settings loaded via OrthoConfig.
//!
//! Values come from `GIGZZ_*` environment variables, CLI flags or a config
//! file. Accessors apply the defaults so callers never see a missing value.

use std::net::SocketAddr;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::IdempotencyConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not `host:port`.
    #[error("invalid bind address '{value}': {message}")]
    InvalidBindAddr { value: String, message: String },
}

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GIGZZ")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string; the in-memory adapter is used when unset.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub db_pool_max_size: Option<u32>,
    /// How long idempotency records are kept, in hours.
    pub idempotency_ttl_hours: Option<u64>,
    /// Skip embedded migrations at startup.
    #[ortho_config(default = false)]
    pub skip_migrations: bool,
}

impl AppSettings {
    /// Parse the configured bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: raw.to_owned(),
                message: err.to_string(),
            })
    }

    /// Database URL when one is configured and non-blank.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Pool size, at least one connection.
    pub fn db_pool_max_size(&self) -> u32 {
        self.db_pool_max_size
            .unwrap_or(DEFAULT_POOL_MAX_SIZE)
            .max(1)
    }

    /// Idempotency record retention, clamped by [`IdempotencyConfig`].
    pub fn idempotency(&self) -> IdempotencyConfig {
        self.idempotency_ttl_hours
            .map(IdempotencyConfig::from_hours)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;
    use std::time::Duration;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 5] = [
        "GIGZZ_BIND_ADDR",
        "GIGZZ_DATABASE_URL",
        "GIGZZ_DB_POOL_MAX_SIZE",
        "GIGZZ_IDEMPOTENCY_TTL_HOURS",
        "GIGZZ_SKIP_MIGRATIONS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("gigzz-backend")])
            .expect("config should load")
    }

    fn cleared() -> Vec<(&'static str, Option<String>)> {
        VARS.iter().map(|name| (*name, None::<String>)).collect()
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(cleared());

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default address"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("socket address")
        );
        assert!(settings.database_url().is_none());
        assert_eq!(settings.db_pool_max_size(), 10);
        assert_eq!(settings.idempotency().ttl(), Duration::from_secs(24 * 3600));
        assert!(!settings.skip_migrations);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("GIGZZ_BIND_ADDR", Some("127.0.0.1:9090".to_owned())),
            (
                "GIGZZ_DATABASE_URL",
                Some("postgres://gigzz@localhost/gigzz".to_owned()),
            ),
            ("GIGZZ_DB_POOL_MAX_SIZE", Some("4".to_owned())),
            ("GIGZZ_IDEMPOTENCY_TTL_HOURS", Some("48".to_owned())),
            ("GIGZZ_SKIP_MIGRATIONS", Some("true".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("address"),
            "127.0.0.1:9090".parse::<SocketAddr>().expect("socket address")
        );
        assert_eq!(
            settings.database_url(),
            Some("postgres://gigzz@localhost/gigzz")
        );
        assert_eq!(settings.db_pool_max_size(), 4);
        assert_eq!(settings.idempotency().ttl(), Duration::from_secs(48 * 3600));
        assert!(settings.skip_migrations);
    }

    #[rstest]
    #[case(Some(0), 1)]
    #[case(Some(1_000_000), IdempotencyConfig::MAX_TTL_HOURS)]
    #[case(None, IdempotencyConfig::DEFAULT_TTL_HOURS)]
    fn idempotency_ttl_is_clamped(#[case] hours: Option<u64>, #[case] expected: u64) {
        let settings = AppSettings {
            bind_addr: None,
            database_url: None,
            db_pool_max_size: None,
            idempotency_ttl_hours: hours,
            skip_migrations: false,
        };
        assert_eq!(
            settings.idempotency().ttl(),
            Duration::from_secs(expected * 3600)
        );
    }

    #[rstest]
    fn blank_database_url_selects_in_memory() {
        let settings = AppSettings {
            bind_addr: Some("not an address".to_owned()),
            database_url: Some("   ".to_owned()),
            db_pool_max_size: Some(0),
            idempotency_ttl_hours: None,
            skip_migrations: false,
        };
        assert!(settings.database_url().is_none());
        assert_eq!(settings.db_pool_max_size(), 1);
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::InvalidBindAddr { .. })
        ));
    }
}
