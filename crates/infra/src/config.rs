//! Process configuration read from environment variables.

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 720;
/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 16 * 1024;
pub const DEV_JWT_SECRET: &str = "dev-secret";

/// Local front-end dev servers.
pub const DEFAULT_CORS_ORIGINS: [&str; 5] = [
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES is enabled")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub seed_demo_data: bool,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            seed_demo_data: true,
            use_persistent_stores: false,
            database_url: None,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any `name -> value` source.
    ///
    /// Unset or blank variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        let token_ttl_minutes = parse(&get, "TOKEN_TTL_MINUTES", defaults.token_ttl_minutes)?;
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&token_ttl_minutes) {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_MINUTES",
                value: token_ttl_minutes.to_string(),
            });
        }

        let use_persistent_stores = flag(&get, "USE_PERSISTENT_STORES", false)?;
        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            port: parse(&get, "PORT", defaults.port)?,
            jwt_secret,
            token_ttl_minutes,
            seed_demo_data: flag(&get, "SEED_DEMO_DATA", defaults.seed_demo_data)?,
            use_persistent_stores,
            database_url,
            cors_origins,
            body_limit_bytes: parse(&get, "BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }
}

fn parse<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn flag(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn values_override_defaults() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("JWT_SECRET", "prod"),
            ("TOKEN_TTL_MINUTES", "30"),
            ("SEED_DEMO_DATA", "false"),
            ("CORS_ORIGINS", "https://a.example, ,https://b.example"),
            ("BODY_LIMIT_BYTES", "1024"),
        ])
        .unwrap();

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.jwt_secret, "prod");
        assert_eq!(cfg.token_ttl(), chrono::Duration::minutes(30));
        assert!(!cfg.seed_demo_data);
        assert_eq!(cfg.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.body_limit_bytes, 1024);
    }

    #[test]
    fn persistent_stores_need_a_database_url() {
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/evax"),
        ])
        .unwrap();
        assert!(cfg.use_persistent_stores);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(config(&[("SEED_DEMO_DATA", "maybe")]).is_err());
        assert!(config(&[("TOKEN_TTL_MINUTES", "0")]).is_err());
    }

    #[test]
    fn token_ttl_is_bounded() {
        assert_eq!(
            config(&[("TOKEN_TTL_MINUTES", "1000000000000")]).unwrap_err(),
            ConfigError::Invalid {
                name: "TOKEN_TTL_MINUTES",
                value: "1000000000000".into(),
            }
        );
        let cfg = config(&[("TOKEN_TTL_MINUTES", &MAX_TOKEN_TTL_MINUTES.to_string())]).unwrap();
        assert!(chrono::Utc::now().checked_add_signed(cfg.token_ttl()).is_some());
    }
}
