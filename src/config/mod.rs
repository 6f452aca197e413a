use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Listings JSON loaded into an empty store at startup
    #[serde(default = "default_seed_file")]
    pub seed_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            seed_file: default_seed_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_seed_file() -> Option<PathBuf> {
    Some(PathBuf::from("./data/properties.json"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens. Generated per process when unset,
    /// which invalidates every token on restart.
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
            min_password_length: default_min_password_length(),
        }
    }
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

fn default_min_password_length() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Requests per window for general API endpoints
    #[serde(default = "default_api_requests_per_window")]
    pub api_requests_per_window: u32,
    /// Requests per window for register/login
    #[serde(default = "default_auth_requests_per_window")]
    pub auth_requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Key clients on `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            api_requests_per_window: default_api_requests_per_window(),
            auth_requests_per_window: default_auth_requests_per_window(),
            window_seconds: default_window_seconds(),
            trust_proxy_headers: false,
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_api_requests_per_window() -> u32 {
    300
}

fn default_auth_requests_per_window() -> u32 {
    20
}

fn default_window_seconds() -> u64 {
    60
}

/// Ten years
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// Apply `UNISTAY_*` environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(secret) = std::env::var("UNISTAY_JWT_SECRET") {
            if !secret.is_empty() {
                self.auth.jwt_secret = Some(secret);
            }
        }
        if let Ok(port) = std::env::var("UNISTAY_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid UNISTAY_PORT: {}", port))?;
        }
        if let Ok(backend) = std::env::var("UNISTAY_STORAGE") {
            self.storage.backend = backend.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.default_page_size == 0 || self.query.max_page_size == 0 {
            anyhow::bail!("query page sizes must be greater than 0");
        }
        if self.query.default_page_size > self.query.max_page_size {
            anyhow::bail!(
                "query.default_page_size ({}) exceeds query.max_page_size ({})",
                self.query.default_page_size,
                self.query.max_page_size
            );
        }
        if self.auth.token_ttl_hours <= 0 || self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            anyhow::bail!(
                "auth.token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            );
        }
        if self.rate_limit.window_seconds == 0 {
            anyhow::bail!("rate_limit.window_seconds must be greater than 0");
        }
        Ok(())
    }
}
