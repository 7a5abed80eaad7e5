use crate::error::{AppError, Result};

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    /// Static API key expected in the `x-api-key` header. When unset the
    /// gateway accepts unauthenticated requests (development only).
    pub api_key: Option<String>,
    pub reasoner: ReasonerConfig,
    pub config_source: ConfigSourceConfig,
    pub context: ContextConfig,
    pub max_batch_size: usize,
    pub batch_workers: usize,
    pub cache_ttl_seconds: u64,
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ReasonerConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub connect_timeout_seconds: u64,
    pub read_timeout_seconds: u64,
    /// Bounded retry for transient reasoner failures. 0 keeps the baseline
    /// fail-fast contract; anything higher is an opt-in extension.
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct ConfigSourceConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub region: String,
    pub connect_timeout_seconds: u64,
    pub read_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Directory holding SLA.md, RTO_RPO_POLICY.md and INCIDENT_HISTORY.md.
    pub docs_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Load environment-specific defaults
        let (default_host, default_port, default_log_level) = match environment.as_str() {
            "production" => ("0.0.0.0", 8084, "info"),
            "staging" => ("0.0.0.0", 8084, "debug"),
            _ => ("127.0.0.1", 8084, "debug"),
        };

        Ok(Config {
            host: env::var("IMPACT_ENGINE_HOST").unwrap_or_else(|_| default_host.to_string()),
            port: env::var("IMPACT_ENGINE_PORT")
                .unwrap_or_else(|_| default_port.to_string())
                .parse()
                .map_err(|e| AppError::ConfigurationError(format!("Invalid port: {}", e)))?,
            environment,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level.to_string()),
            api_key: env::var("API_KEY").ok(),
            reasoner: ReasonerConfig::from_env()?,
            config_source: ConfigSourceConfig::from_env()?,
            context: ContextConfig::from_env(),
            max_batch_size: env::var("MAX_BATCH_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!("Invalid MAX_BATCH_SIZE: {}", e))
                })?,
            batch_workers: env::var("BATCH_WORKERS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!("Invalid BATCH_WORKERS: {}", e))
                })?,
            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!("Invalid CACHE_TTL_SECONDS: {}", e))
                })?,
            metrics_enabled: env::var("METRICS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!("Invalid METRICS_ENABLED: {}", e))
                })?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(AppError::ConfigurationError(
                "Host cannot be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(AppError::ConfigurationError(format!(
                "Invalid port: {}",
                self.port
            )));
        }

        if self.is_production() && self.api_key.is_none() {
            return Err(AppError::ConfigurationError(
                "API_KEY is required in production".to_string(),
            ));
        }

        self.reasoner.validate()?;
        self.config_source.validate()?;

        if self.max_batch_size == 0 || self.max_batch_size > 50 {
            return Err(AppError::ConfigurationError(format!(
                "Invalid max_batch_size: {} (must be 1-50)",
                self.max_batch_size
            )));
        }

        if self.batch_workers == 0 || self.batch_workers > 64 {
            return Err(AppError::ConfigurationError(format!(
                "Invalid batch_workers: {} (must be 1-64)",
                self.batch_workers
            )));
        }

        if self.cache_ttl_seconds == 0 {
            return Err(AppError::ConfigurationError(
                "cache_ttl_seconds must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl ReasonerConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("REASONER_API_KEY").map_err(|_| {
            AppError::ConfigurationError(
                "REASONER_API_KEY environment variable is required".to_string(),
            )
        })?;

        Ok(ReasonerConfig {
            api_url: env::var("REASONER_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            api_key,
            model: env::var("REASONER_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string()),
            max_tokens: env::var("REASONER_MAX_TOKENS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!("Invalid REASONER_MAX_TOKENS: {}", e))
                })?,
            connect_timeout_seconds: env::var("REASONER_CONNECT_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!(
                        "Invalid REASONER_CONNECT_TIMEOUT_SECONDS: {}",
                        e
                    ))
                })?,
            read_timeout_seconds: env::var("REASONER_READ_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!(
                        "Invalid REASONER_READ_TIMEOUT_SECONDS: {}",
                        e
                    ))
                })?,
            max_retries: env::var("REASONER_MAX_RETRIES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!("Invalid REASONER_MAX_RETRIES: {}", e))
                })?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(AppError::ConfigurationError(
                "Reasoner API key cannot be empty".to_string(),
            ));
        }

        if self.api_url.is_empty() {
            return Err(AppError::ConfigurationError(
                "Reasoner API URL cannot be empty".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(AppError::ConfigurationError(
                "Reasoner model cannot be empty".to_string(),
            ));
        }

        if self.max_tokens == 0 || self.max_tokens > 128_000 {
            return Err(AppError::ConfigurationError(format!(
                "Invalid max_tokens: {} (must be 1-128000)",
                self.max_tokens
            )));
        }

        if self.max_retries > 5 {
            return Err(AppError::ConfigurationError(format!(
                "Invalid max_retries: {} (must be 0-5)",
                self.max_retries
            )));
        }

        Ok(())
    }
}

impl ConfigSourceConfig {
    pub fn from_env() -> Result<Self> {
        Ok(ConfigSourceConfig {
            base_url: env::var("CONFIG_SOURCE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8099".to_string()),
            api_token: env::var("CONFIG_SOURCE_TOKEN").ok(),
            region: env::var("CONFIG_SOURCE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            connect_timeout_seconds: env::var("CONFIG_SOURCE_CONNECT_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!(
                        "Invalid CONFIG_SOURCE_CONNECT_TIMEOUT_SECONDS: {}",
                        e
                    ))
                })?,
            read_timeout_seconds: env::var("CONFIG_SOURCE_READ_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|e| {
                    AppError::ConfigurationError(format!(
                        "Invalid CONFIG_SOURCE_READ_TIMEOUT_SECONDS: {}",
                        e
                    ))
                })?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(AppError::ConfigurationError(
                "Config source URL cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::ConfigurationError(
                "Config source URL must be an HTTP(S) endpoint".to_string(),
            ));
        }

        Ok(())
    }
}

impl ContextConfig {
    pub fn from_env() -> Self {
        ContextConfig {
            docs_dir: env::var("BUSINESS_DOCS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./docs")),
        }
    }
}

// Development configuration defaults
impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8084,
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            api_key: None,
            reasoner: ReasonerConfig::default(),
            config_source: ConfigSourceConfig::default(),
            context: ContextConfig::default(),
            max_batch_size: 50,
            batch_workers: 10,
            cache_ttl_seconds: 600,
            metrics_enabled: true,
        }
    }
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        ReasonerConfig {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: "".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 2000,
            connect_timeout_seconds: 5,
            read_timeout_seconds: 30,
            max_retries: 0,
        }
    }
}

impl Default for ConfigSourceConfig {
    fn default() -> Self {
        ConfigSourceConfig {
            base_url: "http://127.0.0.1:8099".to_string(),
            api_token: None,
            region: "us-east-1".to_string(),
            connect_timeout_seconds: 5,
            read_timeout_seconds: 10,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            docs_dir: PathBuf::from("./docs"),
        }
    }
}
