//! What-if differential engine.
//!
//! Runs a baseline analysis and a counterfactual analysis over a modified
//! configuration, then computes the comparative improvement summary. The
//! baseline configuration is resolved exactly once and reused for both
//! legs so the comparison is over consistent inputs.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use db_impact_shared::{
    AnalysisRequest, DatabaseConfig, ImprovementSummary, WhatIfRequest, WhatIfResult,
};

use crate::analyzer::{validate_identifier, AnalysisEngine};
use crate::error::{AppError, Result};
use crate::resolver::ConfigResolver;
use crate::scenarios::ScenarioRegistry;
use crate::telemetry::TelemetrySink;

/// Configuration fields a what-if request may override.
pub const ALLOWED_OVERRIDE_FIELDS: &[&str] = &[
    "multi_az",
    "backup_retention_days",
    "storage_encrypted",
    "instance_class",
    "allocated_storage",
    "max_allocated_storage",
    "read_replicas",
    "auto_minor_version_upgrade",
];

pub struct WhatIfEngine {
    engine: Arc<AnalysisEngine>,
    resolver: Arc<ConfigResolver>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl WhatIfEngine {
    pub fn new(
        engine: Arc<AnalysisEngine>,
        resolver: Arc<ConfigResolver>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            engine,
            resolver,
            telemetry,
        }
    }

    pub async fn what_if(&self, request: &WhatIfRequest) -> Result<WhatIfResult> {
        self.validate(request)?;

        let start = Instant::now();
        info!(
            "Starting what-if analysis for db={}, scenario={}, overrides={:?}",
            request.db_identifier,
            request.scenario,
            request.config_overrides.keys().collect::<Vec<_>>()
        );

        let baseline_config = self.resolver.resolve(&request.db_identifier).await?;
        let modified_config = apply_overrides(&baseline_config, &request.config_overrides)?;

        let analysis_request = AnalysisRequest {
            db_identifier: request.db_identifier.clone(),
            scenario: request.scenario.clone(),
        };

        let baseline_analysis = self
            .engine
            .analyze_with(&analysis_request, Some(baseline_config.clone()), None)
            .await?;

        let what_if_analysis = self
            .engine
            .analyze_with(
                &analysis_request,
                Some(modified_config),
                Some(&baseline_config),
            )
            .await?;

        let improvement_summary = ImprovementSummary {
            severity_improved: what_if_analysis.business_severity
                < baseline_analysis.business_severity,
            severity_change: format!(
                "{} -> {}",
                baseline_analysis.business_severity, what_if_analysis.business_severity
            ),
            rto_reduction_minutes: i64::from(baseline_analysis.expected_outage_time_minutes)
                - i64::from(what_if_analysis.expected_outage_time_minutes),
            sla_violation_prevented: baseline_analysis.sla_violation
                && !what_if_analysis.sla_violation,
            rto_violation_prevented: baseline_analysis.rto_violation
                && !what_if_analysis.rto_violation,
            rpo_violation_prevented: baseline_analysis.rpo_violation
                && !what_if_analysis.rpo_violation,
        };

        // One record covering both analyses' combined duration.
        let duration = start.elapsed();
        if let Err(e) = self
            .telemetry
            .record_what_if(&improvement_summary, duration, &request.scenario)
        {
            warn!("Failed to emit what-if telemetry: {}", e);
        }

        info!(
            "What-if analysis complete in {}ms - {}",
            duration.as_millis(),
            improvement_summary.severity_change
        );
        Ok(WhatIfResult {
            baseline_analysis,
            what_if_analysis,
            improvement_summary,
        })
    }

    fn validate(&self, request: &WhatIfRequest) -> Result<()> {
        validate_identifier(&request.db_identifier)?;

        if !ScenarioRegistry::builtin().exists(&request.scenario) {
            return Err(AppError::ValidationError(format!(
                "Invalid scenario: {}",
                request.scenario
            )));
        }

        if request.config_overrides.is_empty() {
            return Err(AppError::ValidationError(
                "config_overrides cannot be empty".to_string(),
            ));
        }

        for key in request.config_overrides.keys() {
            if !ALLOWED_OVERRIDE_FIELDS.contains(&key.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Override field {:?} is not allowed (allowed: {})",
                    key,
                    ALLOWED_OVERRIDE_FIELDS.join(", ")
                )));
            }
        }

        Ok(())
    }
}

/// Derive the modified configuration by overlaying `overrides` on a clone
/// of `baseline`. Fields not mentioned keep their baseline values.
fn apply_overrides(
    baseline: &DatabaseConfig,
    overrides: &std::collections::BTreeMap<String, Value>,
) -> Result<DatabaseConfig> {
    let mut modified = baseline.clone();

    for (key, value) in overrides {
        match key.as_str() {
            "multi_az" => modified.multi_az = as_bool(key, value)?,
            "backup_retention_days" => {
                modified.backup_retention_days = as_u32(key, value)?;
            }
            "storage_encrypted" => modified.storage_encrypted = as_bool(key, value)?,
            "instance_class" => modified.instance_class = as_string(key, value)?,
            "allocated_storage" => modified.allocated_storage = as_u32(key, value)?,
            "max_allocated_storage" => {
                modified.max_allocated_storage = as_u32(key, value)?;
            }
            "read_replicas" => modified.read_replicas = as_string_list(key, value)?,
            "auto_minor_version_upgrade" => {
                modified.auto_minor_version_upgrade = as_bool(key, value)?;
            }
            other => {
                return Err(AppError::ValidationError(format!(
                    "Override field {:?} is not allowed",
                    other
                )));
            }
        }
    }

    if modified.max_allocated_storage < modified.allocated_storage {
        return Err(AppError::ValidationError(format!(
            "max_allocated_storage ({}) cannot be below allocated_storage ({})",
            modified.max_allocated_storage, modified.allocated_storage
        )));
    }

    Ok(modified)
}

fn as_bool(key: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        AppError::ValidationError(format!("Override {:?} must be a boolean", key))
    })
}

fn as_u32(key: &str, value: &Value) -> Result<u32> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "Override {:?} must be a non-negative integer",
                key
            ))
        })
}

fn as_string(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::ValidationError(format!("Override {:?} must be a string", key)))
}

fn as_string_list(key: &str, value: &Value) -> Result<Vec<String>> {
    value
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(|s| s.to_string()))
                .collect::<Option<Vec<String>>>()
        })
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "Override {:?} must be an array of strings",
                key
            ))
        })
}
