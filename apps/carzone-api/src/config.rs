//! API server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use carzone_db::DbConfig;

/// Default lifetime of an issued token: 24 hours.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Longest accepted per-request store deadline: one hour.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 60 * 60;

/// API server configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Run the schema bootstrap at startup
    pub apply_schema: bool,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub token_lifetime_secs: i64,

    /// Operator login accepted by `/login`
    pub operator_username: String,
    pub operator_password: String,

    /// Deadline applied to every store call made by a request
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ApiConfig {
            http_port: parse_var(&lookup, "HTTP_PORT", "8080")?,

            database_path: lookup("DATABASE_PATH")
                .unwrap_or_else(|| "carzone.db".to_string())
                .into(),

            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", "10")?,

            apply_schema: parse_var(&lookup, "APPLY_SCHEMA", "true")?,

            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| {
                // In production, this MUST be set via environment variable
                "carzone-dev-secret-change-in-production".to_string()
            }),

            token_lifetime_secs: parse_var(
                &lookup,
                "TOKEN_LIFETIME_SECS",
                &DEFAULT_TOKEN_LIFETIME_SECS.to_string(),
            )?,

            operator_username: lookup("OPERATOR_USERNAME").unwrap_or_else(|| "admin".to_string()),

            operator_password: lookup("OPERATOR_PASSWORD")
                .unwrap_or_else(|| "admin123".to_string()),

            request_timeout: Duration::from_secs(parse_var(&lookup, "REQUEST_TIMEOUT_SECS", "30")?),
        };

        if config.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&config.token_lifetime_secs) {
            return Err(ConfigError::InvalidValue("TOKEN_LIFETIME_SECS".to_string()));
        }
        if config.request_timeout.is_zero()
            || config.request_timeout > Duration::from_secs(MAX_REQUEST_TIMEOUT_SECS)
        {
            return Err(ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS".to_string()));
        }
        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.http_port))
    }

    /// Pool configuration derived from this config.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.db_max_connections)
            .apply_schema(self.apply_schema)
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("http_port", &self.http_port)
            .field("database_path", &self.database_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("apply_schema", &self.apply_schema)
            .field("jwt_secret", &"<redacted>")
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("operator_username", &self.operator_username)
            .field("operator_password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, PathBuf::from("carzone.db"));
        assert_eq!(config.db_max_connections, 10);
        assert!(config.apply_schema);
        assert_eq!(config.token_lifetime_secs, 86_400);
        assert_eq!(config.operator_username, "admin");
        assert_eq!(config.operator_password, "admin123");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("HTTP_PORT", "9090"),
            ("DATABASE_PATH", "/tmp/cars.db"),
            ("APPLY_SCHEMA", "false"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().port(), 9090);
        assert!(!config.db_config().apply_schema);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_port = ApiConfig::from_lookup(lookup_from(&[("HTTP_PORT", "eighty")]));
        assert!(matches!(bad_port, Err(ConfigError::InvalidValue(key)) if key == "HTTP_PORT"));

        let zero_lifetime = ApiConfig::from_lookup(lookup_from(&[("TOKEN_LIFETIME_SECS", "0")]));
        assert!(matches!(zero_lifetime, Err(ConfigError::InvalidValue(_))));

        let huge_lifetime = ApiConfig::from_lookup(lookup_from(&[(
            "TOKEN_LIFETIME_SECS",
            "9223372036854775807",
        )]));
        assert!(
            matches!(huge_lifetime, Err(ConfigError::InvalidValue(key)) if key == "TOKEN_LIFETIME_SECS")
        );

        let huge_timeout = ApiConfig::from_lookup(lookup_from(&[(
            "REQUEST_TIMEOUT_SECS",
            "18446744073709551615",
        )]));
        assert!(
            matches!(huge_timeout, Err(ConfigError::InvalidValue(key)) if key == "REQUEST_TIMEOUT_SECS")
        );

        let at_limits = ApiConfig::from_lookup(lookup_from(&[
            ("TOKEN_LIFETIME_SECS", MAX_TOKEN_LIFETIME_SECS.to_string().as_str()),
            ("REQUEST_TIMEOUT_SECS", MAX_REQUEST_TIMEOUT_SECS.to_string().as_str()),
        ]));
        assert!(at_limits.is_ok());

        let empty_secret = ApiConfig::from_lookup(lookup_from(&[("JWT_SECRET", "")]));
        assert!(matches!(empty_secret, Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ApiConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cr3t")])).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("admin123"));
    }
}
