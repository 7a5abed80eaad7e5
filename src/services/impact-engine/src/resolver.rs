//! Configuration resolver for managed database instances.
//!
//! Resolution checks an in-memory seed directory first and only then issues
//! a single bounded describe call against the external config source. The
//! source's error taxonomy is mapped onto NotFound / PermissionDenied /
//! Timeout; there is no retry at this layer.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use db_impact_shared::DatabaseConfig;

use crate::config::ConfigSourceConfig;
use crate::error::{AppError, Result};

pub struct ConfigResolver {
    seed: HashMap<String, DatabaseConfig>,
    http: Client,
    base_url: String,
    api_token: Option<String>,
    region: String,
}

/// Raw describe payload as the config source reports it. Optional fields
/// are the ones the source is allowed to omit; `normalize` fills them.
#[derive(Debug, Deserialize)]
struct RawDatabaseConfig {
    identifier: String,
    engine: String,
    instance_class: String,
    #[serde(default)]
    multi_az: bool,
    #[serde(default)]
    backup_retention_days: u32,
    pitr_enabled: Option<bool>,
    #[serde(default)]
    allocated_storage: u32,
    max_allocated_storage: Option<u32>,
    #[serde(default)]
    read_replicas: Vec<String>,
    #[serde(default)]
    storage_encrypted: bool,
    #[serde(default = "default_auto_minor_upgrade")]
    auto_minor_version_upgrade: bool,
    engine_version: Option<String>,
}

fn default_auto_minor_upgrade() -> bool {
    true
}

impl RawDatabaseConfig {
    fn normalize(self) -> DatabaseConfig {
        // Heuristic when the source omits PITR: infer it from retention.
        // The two properties are independently configurable, so this can
        // overstate actual recovery capability.
        let pitr_enabled = self
            .pitr_enabled
            .unwrap_or(self.backup_retention_days > 0);

        let allocated_storage = self.allocated_storage;
        let max_allocated_storage = self
            .max_allocated_storage
            .unwrap_or(allocated_storage)
            .max(allocated_storage);

        DatabaseConfig {
            identifier: self.identifier,
            engine: self.engine,
            instance_class: self.instance_class,
            multi_az: self.multi_az,
            backup_retention_days: self.backup_retention_days,
            pitr_enabled,
            allocated_storage,
            max_allocated_storage,
            read_replicas: self.read_replicas,
            storage_encrypted: self.storage_encrypted,
            auto_minor_version_upgrade: self.auto_minor_version_upgrade,
            engine_version: self.engine_version,
        }
    }
}

impl ConfigResolver {
    pub fn new(config: &ConfigSourceConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.read_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::ConfigurationError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            seed: seed_directory(),
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            region: config.region.clone(),
        })
    }

    /// Resolve a normalized configuration snapshot for `identifier`.
    pub async fn resolve(&self, identifier: &str) -> Result<DatabaseConfig> {
        if let Some(config) = self.seed.get(identifier) {
            debug!("Resolved {} from seed directory", identifier);
            return Ok(config.clone());
        }

        self.describe_remote(identifier).await
    }

    async fn describe_remote(&self, identifier: &str) -> Result<DatabaseConfig> {
        let url = format!("{}/v1/instances/{}", self.base_url, identifier);
        info!("Describing {} via config source", identifier);

        let mut request = self.http.get(&url).query(&[("region", &self.region)]);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(format!(
                    "Database {} not found",
                    identifier
                )));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::PermissionDenied(format!(
                    "No permission to describe database {}",
                    identifier
                )));
            }
            status if !status.is_success() => {
                return Err(AppError::ServiceUnavailable(format!(
                    "Config source returned {} for {}",
                    status, identifier
                )));
            }
            _ => {}
        }

        let raw: RawDatabaseConfig = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Invalid describe payload: {}", e))
        })?;

        Ok(raw.normalize())
    }
}

/// In-memory directory of known instances, served without touching the
/// external config source.
fn seed_directory() -> HashMap<String, DatabaseConfig> {
    let mut seed = HashMap::new();
    seed.insert(
        "prod-orders-db-01".to_string(),
        DatabaseConfig {
            identifier: "prod-orders-db-01".to_string(),
            engine: "mysql".to_string(),
            instance_class: "db.m5.large".to_string(),
            multi_az: false,
            backup_retention_days: 1,
            pitr_enabled: false,
            allocated_storage: 200,
            max_allocated_storage: 200,
            read_replicas: vec![],
            storage_encrypted: false,
            auto_minor_version_upgrade: true,
            engine_version: Some("8.0.35".to_string()),
        },
    );
    seed.insert(
        "prod-users-db".to_string(),
        DatabaseConfig {
            identifier: "prod-users-db".to_string(),
            engine: "postgres".to_string(),
            instance_class: "db.m5.xlarge".to_string(),
            multi_az: true,
            backup_retention_days: 7,
            pitr_enabled: true,
            allocated_storage: 500,
            max_allocated_storage: 1000,
            read_replicas: vec!["prod-users-db-replica-1".to_string()],
            storage_encrypted: true,
            auto_minor_version_upgrade: true,
            engine_version: Some("15.4".to_string()),
        },
    );
    seed
}
