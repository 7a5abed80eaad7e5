//! Request and response types for the impact engine API surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::core::{ImpactResult, Severity};

fn default_scenario() -> String {
    "primary_db_failure".to_string()
}

// ============================================================================
// REQUEST TYPES
// ============================================================================

/// Single impact analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub db_identifier: String,
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

/// Batch impact analysis request: one scenario applied to many databases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnalysisRequest {
    pub db_identifiers: Vec<String>,
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

/// What-if analysis request: a baseline run compared against the same
/// scenario with configuration overrides applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfRequest {
    pub db_identifier: String,
    #[serde(default = "default_scenario")]
    pub scenario: String,
    pub config_overrides: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

/// Per-database outcome inside a batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Success { analysis: ImpactResult },
    Error { error: String },
}

impl BatchOutcome {
    pub fn severity(&self) -> Option<Severity> {
        match self {
            BatchOutcome::Success { analysis } => Some(analysis.business_severity),
            BatchOutcome::Error { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success { .. })
    }
}

/// One entry of a batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub db_identifier: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// Aggregated batch response.
///
/// Invariants: `total_count == results.len()` and the four severity
/// counters sum to the number of success items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub results: Vec<BatchItem>,
}

/// Comparative summary between a baseline and a what-if analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementSummary {
    pub severity_improved: bool,
    /// Label of the form "HIGH -> LOW".
    pub severity_change: String,
    /// May be negative when the modified configuration is worse.
    pub rto_reduction_minutes: i64,
    pub sla_violation_prevented: bool,
    pub rto_violation_prevented: bool,
    pub rpo_violation_prevented: bool,
}

/// Full what-if response: both analyses plus the improvement summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub baseline_analysis: ImpactResult,
    pub what_if_analysis: ImpactResult,
    pub improvement_summary: ImprovementSummary,
}

/// Scenario catalog entry as exposed by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_request_defaults_scenario() {
        let req: AnalysisRequest =
            serde_json::from_str(r#"{"db_identifier": "prod-orders-db-01"}"#).unwrap();
        assert_eq!(req.scenario, "primary_db_failure");
    }

    #[test]
    fn batch_item_serializes_with_status_tag() {
        let item = BatchItem {
            db_identifier: "prod-orders-db-01".to_string(),
            outcome: BatchOutcome::Error {
                error: "Database not found".to_string(),
            },
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "Database not found");
        assert_eq!(json["db_identifier"], "prod-orders-db-01");
    }

    #[test]
    fn what_if_request_round_trips_overrides() {
        let req: WhatIfRequest = serde_json::from_str(
            r#"{"db_identifier": "prod-orders-db-01", "config_overrides": {"multi_az": true}}"#,
        )
        .unwrap();
        assert_eq!(req.scenario, "primary_db_failure");
        assert_eq!(
            req.config_overrides.get("multi_az"),
            Some(&serde_json::Value::Bool(true))
        );
    }
}
