//! Core type definitions for the DB-IMPACT Platform
//!
//! Database configuration snapshots and impact analysis results shared by
//! the impact engine and any service consuming its output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DATABASE CONFIGURATION
// ============================================================================

/// Normalized snapshot of a managed database instance's configuration.
///
/// Built fresh for every analysis and never mutated in place; a what-if
/// configuration is a new value derived by overlaying overrides on a clone
/// of the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub identifier: String,
    pub engine: String,
    pub instance_class: String,
    pub multi_az: bool,
    pub backup_retention_days: u32,
    pub pitr_enabled: bool,
    /// Allocated storage in GB.
    pub allocated_storage: u32,
    /// Storage autoscaling ceiling in GB. Invariant: >= `allocated_storage`.
    pub max_allocated_storage: u32,
    pub read_replicas: Vec<String>,
    pub storage_encrypted: bool,
    pub auto_minor_version_upgrade: bool,
    pub engine_version: Option<String>,
}

impl DatabaseConfig {
    /// True when storage autoscaling still has headroom to grow into.
    pub fn autoscaling_enabled(&self) -> bool {
        self.max_allocated_storage > self.allocated_storage
    }
}

// ============================================================================
// IMPACT ANALYSIS RESULTS
// ============================================================================

/// Business severity of a simulated failure.
///
/// Ordered `Low < Medium < High < Critical` so comparisons read naturally
/// (`modified < baseline` means the severity improved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Sort rank used for batch ordering: CRITICAL=0 .. LOW=3.
    pub fn sort_rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("Invalid severity: {}", s)),
        }
    }
}

/// Structured verdict of one impact analysis.
///
/// Either every field deserialized and validated, or the result does not
/// exist; there is no partially populated variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactResult {
    pub sla_violation: bool,
    pub rto_violation: bool,
    pub rpo_violation: bool,
    pub expected_outage_time_minutes: u32,
    pub business_severity: Severity,
    pub why: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_rank() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);

        assert_eq!(Severity::Critical.sort_rank(), 0);
        assert_eq!(Severity::Low.sort_rank(), 3);
    }

    #[test]
    fn severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");

        let parsed: Severity = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn severity_rejects_unknown_rank() {
        let parsed: Result<Severity, _> = serde_json::from_str("\"SEVERE\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn autoscaling_requires_headroom() {
        let config = DatabaseConfig {
            identifier: "prod-orders-db-01".to_string(),
            engine: "mysql".to_string(),
            instance_class: "db.m5.large".to_string(),
            multi_az: false,
            backup_retention_days: 1,
            pitr_enabled: false,
            allocated_storage: 100,
            max_allocated_storage: 100,
            read_replicas: vec![],
            storage_encrypted: false,
            auto_minor_version_upgrade: true,
            engine_version: None,
        };
        assert!(!config.autoscaling_enabled());

        let scaled = DatabaseConfig {
            max_allocated_storage: 300,
            ..config
        };
        assert!(scaled.autoscaling_enabled());
    }
}
