//! Single analysis orchestrator.
//!
//! Composes the config resolver, business context store, prompt assembler
//! and reasoning invoker into one end-to-end analysis. Telemetry emission
//! is fire-and-forget and can never affect the returned result.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use db_impact_shared::{AnalysisRequest, DatabaseConfig, ImpactResult};

use crate::context::BusinessContextStore;
use crate::error::{AppError, Result};
use crate::prompt::build_prompt;
use crate::reasoner::{parse_impact_response, Reasoner};
use crate::resolver::ConfigResolver;
use crate::scenarios::ScenarioRegistry;
use crate::telemetry::TelemetrySink;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z][A-Za-z0-9-]{0,62}$").expect("valid identifier regex"));

/// Identifier syntax: 1-63 chars, alphanumeric and hyphens, starts with a
/// letter.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if !IDENTIFIER_RE.is_match(identifier) {
        return Err(AppError::ValidationError(format!(
            "Invalid database identifier: {:?} (must start with a letter, \
             contain only alphanumerics and hyphens, max 63 chars)",
            identifier
        )));
    }
    Ok(())
}

pub fn validate_request(request: &AnalysisRequest) -> Result<()> {
    validate_identifier(&request.db_identifier)?;
    if !ScenarioRegistry::builtin().exists(&request.scenario) {
        return Err(AppError::ValidationError(format!(
            "Invalid scenario: {}",
            request.scenario
        )));
    }
    Ok(())
}

pub struct AnalysisEngine {
    resolver: Arc<ConfigResolver>,
    context: Arc<BusinessContextStore>,
    reasoner: Arc<dyn Reasoner>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl AnalysisEngine {
    pub fn new(
        resolver: Arc<ConfigResolver>,
        context: Arc<BusinessContextStore>,
        reasoner: Arc<dyn Reasoner>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            resolver,
            context,
            reasoner,
            telemetry,
        }
    }

    /// Run one analysis, resolving the configuration from the request.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<ImpactResult> {
        self.analyze_with(request, None, None).await
    }

    /// Run one analysis with an optionally pre-resolved configuration.
    ///
    /// `db_state` lets the what-if engine reuse an already-fetched baseline
    /// instead of describing the instance twice; `baseline` switches the
    /// prompt into delta-aware what-if mode.
    pub async fn analyze_with(
        &self,
        request: &AnalysisRequest,
        db_state: Option<DatabaseConfig>,
        baseline: Option<&DatabaseConfig>,
    ) -> Result<ImpactResult> {
        validate_request(request)?;

        let start = Instant::now();
        info!(
            "Starting analysis for db={}, scenario={}",
            request.db_identifier, request.scenario
        );

        let scenario = ScenarioRegistry::builtin().lookup(&request.scenario)?;

        let config = match db_state {
            Some(config) => {
                info!("Using provided DB state (skipped fetch)");
                config
            }
            None => {
                let fetch_start = Instant::now();
                let config = self.resolver.resolve(&request.db_identifier).await?;
                info!(
                    "DB state fetch: {}ms",
                    fetch_start.elapsed().as_millis()
                );
                config
            }
        };

        let context_start = Instant::now();
        let business_context = self.context.load().await?;
        info!(
            "Business context fetch: {}ms",
            context_start.elapsed().as_millis()
        );

        let prompt = build_prompt(request, &config, scenario, &business_context, baseline);

        let infer_start = Instant::now();
        let raw_reply = self.reasoner.infer(&prompt).await?;
        info!("Reasoner inference: {}ms", infer_start.elapsed().as_millis());

        let result = parse_impact_response(&raw_reply)?;

        let duration = start.elapsed();
        if let Err(e) = self
            .telemetry
            .record_analysis(&result, duration, &request.scenario)
        {
            warn!("Failed to emit analysis telemetry: {}", e);
        }

        info!(
            "Analysis complete in {}ms - severity={}, sla_violation={}",
            duration.as_millis(),
            result.business_severity,
            result.sla_violation
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSourceConfig, ContextConfig};
    use crate::telemetry::{NoopTelemetry, TelemetryError};
    use async_trait::async_trait;
    use db_impact_shared::{BatchResult, ImprovementSummary, Severity};
    use std::fs;
    use std::time::Duration;

    const VALID_REPLY: &str = r#"{
        "sla_violation": true,
        "rto_violation": true,
        "rpo_violation": true,
        "expected_outage_time_minutes": 90,
        "business_severity": "CRITICAL",
        "why": ["no failover standby"],
        "recommendations": ["enable Multi-AZ"],
        "confidence": 0.8
    }"#;

    struct StubReasoner {
        reply: String,
    }

    #[async_trait]
    impl Reasoner for StubReasoner {
        async fn infer(&self, _prompt: &str) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingTelemetry;

    impl TelemetrySink for FailingTelemetry {
        fn record_analysis(
            &self,
            _result: &ImpactResult,
            _duration: Duration,
            _scenario: &str,
        ) -> std::result::Result<(), TelemetryError> {
            Err(TelemetryError::Emit("sink offline".to_string()))
        }

        fn record_batch(
            &self,
            _batch: &BatchResult,
            _duration: Duration,
        ) -> std::result::Result<(), TelemetryError> {
            Err(TelemetryError::Emit("sink offline".to_string()))
        }

        fn record_what_if(
            &self,
            _summary: &ImprovementSummary,
            _duration: Duration,
            _scenario: &str,
        ) -> std::result::Result<(), TelemetryError> {
            Err(TelemetryError::Emit("sink offline".to_string()))
        }
    }

    fn docs_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SLA.md"), "99.9% availability").unwrap();
        fs::write(dir.path().join("RTO_RPO_POLICY.md"), "RTO 30m, RPO 1h").unwrap();
        fs::write(dir.path().join("INCIDENT_HISTORY.md"), "2024-03-15: 87m restore").unwrap();
        dir
    }

    fn engine_with(
        reply: &str,
        docs: &tempfile::TempDir,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> AnalysisEngine {
        AnalysisEngine::new(
            Arc::new(ConfigResolver::new(&ConfigSourceConfig::default()).unwrap()),
            Arc::new(BusinessContextStore::new(&ContextConfig {
                docs_dir: docs.path().to_path_buf(),
            })),
            Arc::new(StubReasoner {
                reply: reply.to_string(),
            }),
            telemetry,
        )
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            db_identifier: "prod-orders-db-01".to_string(),
            scenario: "primary_db_failure".to_string(),
        }
    }

    #[test]
    fn identifier_syntax_is_enforced() {
        assert!(validate_identifier("prod-orders-db-01").is_ok());
        assert!(validate_identifier("a").is_ok());
        assert!(validate_identifier(&format!("a{}", "b".repeat(62))).is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1prod").is_err());
        assert!(validate_identifier("prod_orders").is_err());
        assert!(validate_identifier(&format!("a{}", "b".repeat(63))).is_err());
    }

    #[test]
    fn unknown_scenario_fails_validation() {
        let request = AnalysisRequest {
            db_identifier: "prod-orders-db-01".to_string(),
            scenario: "meteor_strike".to_string(),
        };
        let err = validate_request(&request).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn analyze_returns_parsed_verdict() {
        let docs = docs_dir();
        let engine = engine_with(VALID_REPLY, &docs, Arc::new(NoopTelemetry));

        let result = engine.analyze(&request()).await.unwrap();
        assert_eq!(result.business_severity, Severity::Critical);
        assert_eq!(result.expected_outage_time_minutes, 90);
    }

    #[tokio::test]
    async fn malformed_reply_fails_closed() {
        let docs = docs_dir();
        let engine = engine_with("no json here", &docs, Arc::new(NoopTelemetry));

        let err = engine.analyze(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn telemetry_failure_never_reaches_the_caller() {
        let docs = docs_dir();
        let engine = engine_with(VALID_REPLY, &docs, Arc::new(FailingTelemetry));

        let result = engine.analyze(&request()).await.unwrap();
        assert_eq!(result.business_severity, Severity::Critical);
    }

    #[tokio::test]
    async fn supplied_config_skips_resolution() {
        let docs = docs_dir();
        let engine = engine_with(VALID_REPLY, &docs, Arc::new(NoopTelemetry));

        // "ghost-db" is in no directory; a resolve attempt would fail.
        let supplied = DatabaseConfig {
            identifier: "ghost-db".to_string(),
            engine: "postgres".to_string(),
            instance_class: "db.t3.medium".to_string(),
            multi_az: false,
            backup_retention_days: 0,
            pitr_enabled: false,
            allocated_storage: 50,
            max_allocated_storage: 50,
            read_replicas: vec![],
            storage_encrypted: false,
            auto_minor_version_upgrade: true,
            engine_version: None,
        };
        let request = AnalysisRequest {
            db_identifier: "ghost-db".to_string(),
            scenario: "primary_db_failure".to_string(),
        };

        let result = engine
            .analyze_with(&request, Some(supplied), None)
            .await
            .unwrap();
        assert_eq!(result.business_severity, Severity::Critical);
    }

    #[tokio::test]
    async fn missing_business_docs_abort_the_analysis() {
        let empty = tempfile::tempdir().unwrap();
        let engine = engine_with(VALID_REPLY, &empty, Arc::new(NoopTelemetry));

        let err = engine.analyze(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::ContextUnavailable(_)));
    }
}
