//! Telemetry sink for analysis metrics.
//!
//! Emission is fire-and-forget: call sites recover and log every
//! [`TelemetryError`] locally, so a broken sink can never fail or delay an
//! analysis. Tests substitute [`NoopTelemetry`] or their own double.

use metrics::{counter, histogram};
use std::time::Duration;

use db_impact_shared::{BatchResult, ImpactResult, ImprovementSummary};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Telemetry emission failed: {0}")]
    Emit(String),
}

pub trait TelemetrySink: Send + Sync {
    fn record_analysis(
        &self,
        result: &ImpactResult,
        duration: Duration,
        scenario: &str,
    ) -> Result<(), TelemetryError>;

    fn record_batch(&self, batch: &BatchResult, duration: Duration) -> Result<(), TelemetryError>;

    fn record_what_if(
        &self,
        summary: &ImprovementSummary,
        duration: Duration,
        scenario: &str,
    ) -> Result<(), TelemetryError>;
}

/// Production sink backed by the `metrics` facade; the exporter installed
/// in `main` handles delivery.
pub struct MetricsTelemetry;

impl TelemetrySink for MetricsTelemetry {
    fn record_analysis(
        &self,
        result: &ImpactResult,
        duration: Duration,
        scenario: &str,
    ) -> Result<(), TelemetryError> {
        counter!(
            "db_impact_analysis_count",
            "severity" => result.business_severity.to_string(),
            "scenario" => scenario.to_string()
        )
        .increment(1);
        histogram!("db_impact_analysis_duration_ms").record(duration.as_millis() as f64);

        if result.sla_violation {
            counter!("db_impact_sla_violation_count").increment(1);
        }
        if result.rto_violation {
            counter!("db_impact_rto_violation_count").increment(1);
        }
        if result.rpo_violation {
            counter!("db_impact_rpo_violation_count").increment(1);
        }

        Ok(())
    }

    fn record_batch(&self, batch: &BatchResult, duration: Duration) -> Result<(), TelemetryError> {
        counter!("db_impact_batch_count").increment(1);
        histogram!("db_impact_batch_size").record(batch.total_count as f64);
        histogram!("db_impact_batch_duration_ms").record(duration.as_millis() as f64);

        counter!("db_impact_batch_severity_count", "severity" => "CRITICAL")
            .increment(batch.critical_count as u64);
        counter!("db_impact_batch_severity_count", "severity" => "HIGH")
            .increment(batch.high_count as u64);
        counter!("db_impact_batch_severity_count", "severity" => "MEDIUM")
            .increment(batch.medium_count as u64);
        counter!("db_impact_batch_severity_count", "severity" => "LOW")
            .increment(batch.low_count as u64);

        Ok(())
    }

    fn record_what_if(
        &self,
        summary: &ImprovementSummary,
        duration: Duration,
        scenario: &str,
    ) -> Result<(), TelemetryError> {
        counter!("db_impact_what_if_count", "scenario" => scenario.to_string()).increment(1);
        histogram!("db_impact_what_if_duration_ms").record(duration.as_millis() as f64);
        histogram!("db_impact_what_if_rto_reduction_minutes")
            .record(summary.rto_reduction_minutes as f64);

        if summary.severity_improved {
            counter!("db_impact_what_if_severity_improved_count").increment(1);
        }
        if summary.sla_violation_prevented {
            counter!("db_impact_what_if_sla_prevented_count").increment(1);
        }
        if summary.rto_violation_prevented {
            counter!("db_impact_what_if_rto_prevented_count").increment(1);
        }
        if summary.rpo_violation_prevented {
            counter!("db_impact_what_if_rpo_prevented_count").increment(1);
        }

        Ok(())
    }
}

/// Test double that records nothing.
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record_analysis(
        &self,
        _result: &ImpactResult,
        _duration: Duration,
        _scenario: &str,
    ) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn record_batch(
        &self,
        _batch: &BatchResult,
        _duration: Duration,
    ) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn record_what_if(
        &self,
        _summary: &ImprovementSummary,
        _duration: Duration,
        _scenario: &str,
    ) -> Result<(), TelemetryError> {
        Ok(())
    }
}
