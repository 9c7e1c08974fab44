use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub starfish_endpoint: String,
    pub starfish_token: String,
    pub file_server: Option<String>,
    pub cache_ttl_secs: u64,
    pub collections_refresh_interval_secs: u64,
    pub path_rewrite_config: Option<PathBuf>,
    pub upstream_timeout_secs: u64,
    pub query_limit: usize,
    pub strict_prefix_filter: bool,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                reason: format!("{raw:?} is not a port number"),
            })?,
            Err(_) => 8080,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            starfish_endpoint: required("STARFISH_ENDPOINT")?,
            starfish_token: required("STARFISH_TOKEN")?,
            file_server: optional("STARFISH_FILE_SERVER"),
            cache_ttl_secs: parse_env("CACHE_TTL_SECS", 3600),
            collections_refresh_interval_secs: parse_env("COLLECTIONS_REFRESH_INTERVAL_SECS", 600),
            path_rewrite_config: optional("PATH_REWRITE_CONFIG").map(PathBuf::from),
            upstream_timeout_secs: parse_env("UPSTREAM_TIMEOUT_SECS", 30),
            query_limit: parse_env("QUERY_LIMIT", 1000),
            strict_prefix_filter: parse_env("STRICT_PREFIX_FILTER", false),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        })
    }

    /// Settings for in-process use; nothing is read from the environment.
    pub fn for_endpoint(endpoint: &str, token: &str) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            starfish_endpoint: endpoint.into(),
            starfish_token: token.into(),
            file_server: None,
            cache_ttl_secs: 3600,
            collections_refresh_interval_secs: 600,
            path_rewrite_config: None,
            upstream_timeout_secs: 30,
            query_limit: 1000,
            strict_prefix_filter: false,
            log_level: "info".into(),
        }
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
