//! Application settings and source connection parameters.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;


/// Default PostgreSQL port when `PROD_DB_PORT` is not set.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default invocation mode recorded in `run_info`.
pub const DEFAULT_MODE: &str = "prod";

/// File name of the snapshot store.
pub const STORE_FILE_NAME: &str = "db_monitoring.sqlite";

pub const ENV_HOST: &str = "PROD_DB_HOST";
pub const ENV_PORT: &str = "PROD_DB_PORT";
pub const ENV_NAME: &str = "PROD_DB_NAME";
pub const ENV_USER: &str = "PROD_DB_USER";
pub const ENV_PASSWORD: &str = "PROD_DB_PASSWORD";


/// Invalid or incomplete configuration. Always raised before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required env: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}


/// Connection parameters for the source database.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}


impl SourceConfig {
    /// Build a source configuration from optional raw values.
    ///
    /// Empty or whitespace-only values count as missing. The port falls back
    /// to [`DEFAULT_DB_PORT`].
    pub fn from_parts(
        host: Option<String>,
        port: Option<String>,
        database: Option<String>,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = require(host, ENV_HOST)?;
        let port = match port.filter(|p| !p.trim().is_empty()) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: ENV_PORT,
                value: raw,
            })?,
            None => DEFAULT_DB_PORT,
        };
        let database = require(database, ENV_NAME)?;
        let user = require(user, ENV_USER)?;
        let password = require(password, ENV_PASSWORD)?;

        Ok(Self { host, port, database, user, password })
    }

    /// libpq key=value connection string.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            quote_conn_value(&self.host),
            self.port,
            quote_conn_value(&self.user),
            quote_conn_value(&self.password),
            quote_conn_value(&self.database),
        )
    }
}


impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}


/// Everything a collection run needs, passed explicitly to each step.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub store_path: PathBuf,
    pub mode: String,
    pub source: SourceConfig,
}


/// Get the default snapshot store path.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("dbfp").join(STORE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(STORE_FILE_NAME))
}


fn require(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}


/// Quote a value for a libpq connection string when it needs it.
fn quote_conn_value(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value.chars().any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quoting {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}


#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_from_parts_complete() {
        let cfg = SourceConfig::from_parts(
            some("db.internal"),
            some("6432"),
            some("metrics"),
            some("reader"),
            some("secret"),
        )
        .unwrap();

        assert_eq!(cfg.host, "db.internal");
        assert_eq!(cfg.port, 6432);
        assert_eq!(cfg.database, "metrics");
    }

    #[test]
    fn test_default_port() {
        let cfg = SourceConfig::from_parts(some("h"), None, some("d"), some("u"), some("p")).unwrap();
        assert_eq!(cfg.port, DEFAULT_DB_PORT);
    }

    #[test]
    fn test_missing_host_reported_first() {
        let err = SourceConfig::from_parts(None, None, None, None, None).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_HOST));
    }

    #[test]
    fn test_empty_value_is_missing() {
        let err = SourceConfig::from_parts(some("h"), None, some("d"), some("u"), some("  "))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_PASSWORD));
        assert_eq!(err.to_string(), "Missing required env: PROD_DB_PASSWORD");
    }

    #[test]
    fn test_invalid_port() {
        let err = SourceConfig::from_parts(some("h"), some("abc"), some("d"), some("u"), some("p"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_PORT, .. }));
    }

    #[test]
    fn test_connection_string_quotes_values() {
        let cfg = SourceConfig::from_parts(some("h"), None, some("d"), some("u"), some("it's a pw"))
            .unwrap();
        assert_eq!(
            cfg.connection_string(),
            r"host=h port=5432 user=u password='it\'s a pw' dbname=d"
        );
    }

    #[test]
    fn test_connection_string_quotes_any_whitespace() {
        let cfg = SourceConfig::from_parts(some("h"), None, some("d"), some("u"), some("pa\tss\nword"))
            .unwrap();
        assert_eq!(
            cfg.connection_string(),
            "host=h port=5432 user=u password='pa\tss\nword' dbname=d"
        );
        assert_eq!(quote_conn_value("plain"), "plain");
        assert_eq!(quote_conn_value(""), "''");
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = SourceConfig::from_parts(some("h"), None, some("d"), some("u"), some("hunter2"))
            .unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_default_store_path() {
        let path = default_store_path();
        assert!(path.to_string_lossy().ends_with(STORE_FILE_NAME));
    }
}
