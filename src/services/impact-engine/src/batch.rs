//! Batch analysis orchestrator.
//!
//! Dispatches one analysis task per identifier onto a fixed-size worker
//! pool. Each task settles independently: a failing analysis becomes an
//! error item and never cancels its siblings. Output ordering is success
//! items before error items, success sorted by severity rank; it carries
//! no positional correspondence to the input list.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use db_impact_shared::{
    AnalysisRequest, BatchAnalysisRequest, BatchItem, BatchOutcome, BatchResult, Severity,
};

use crate::analyzer::{validate_identifier, AnalysisEngine};
use crate::error::{AppError, Result};
use crate::scenarios::ScenarioRegistry;
use crate::telemetry::TelemetrySink;

pub struct BatchAnalyzer {
    engine: Arc<AnalysisEngine>,
    telemetry: Arc<dyn TelemetrySink>,
    max_batch_size: usize,
    workers: usize,
}

impl BatchAnalyzer {
    pub fn new(
        engine: Arc<AnalysisEngine>,
        telemetry: Arc<dyn TelemetrySink>,
        max_batch_size: usize,
        workers: usize,
    ) -> Self {
        Self {
            engine,
            telemetry,
            max_batch_size,
            workers,
        }
    }

    /// Run one scenario against every identifier in the batch.
    pub async fn analyze_batch(&self, request: &BatchAnalysisRequest) -> Result<BatchResult> {
        self.validate(request)?;

        let start = Instant::now();
        info!(
            "Starting batch analysis for {} databases, scenario={}",
            request.db_identifiers.len(),
            request.scenario
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut in_flight = FuturesUnordered::new();

        for identifier in request.db_identifiers.iter().cloned() {
            let engine = self.engine.clone();
            let semaphore = semaphore.clone();
            let scenario = request.scenario.clone();
            let task_identifier = identifier.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| {
                    AppError::InternalServerError(format!("Worker pool closed: {}", e))
                })?;
                let analysis_request = AnalysisRequest {
                    db_identifier: task_identifier,
                    scenario,
                };
                engine.analyze(&analysis_request).await
            });

            in_flight.push(async move { (identifier, handle.await) });
        }

        let mut critical_count = 0;
        let mut high_count = 0;
        let mut medium_count = 0;
        let mut low_count = 0;
        let mut results = Vec::with_capacity(request.db_identifiers.len());

        // Join semantics: every dispatched task settles before we return.
        while let Some((identifier, joined)) = in_flight.next().await {
            let outcome = match joined {
                Ok(Ok(analysis)) => {
                    match analysis.business_severity {
                        Severity::Critical => critical_count += 1,
                        Severity::High => high_count += 1,
                        Severity::Medium => medium_count += 1,
                        Severity::Low => low_count += 1,
                    }
                    BatchOutcome::Success { analysis }
                }
                Ok(Err(e)) => {
                    warn!("Batch item {} failed: {}", identifier, e);
                    BatchOutcome::Error {
                        error: e.to_string(),
                    }
                }
                Err(e) => {
                    warn!("Batch task for {} did not complete: {}", identifier, e);
                    BatchOutcome::Error {
                        error: format!("Analysis task failed: {}", e),
                    }
                }
            };
            results.push(BatchItem {
                db_identifier: identifier,
                outcome,
            });
        }

        // Success before error, success by severity rank; the stable sort
        // keeps completion order within a rank.
        results.sort_by_key(|item| {
            item.outcome
                .severity()
                .map(|s| s.sort_rank())
                .unwrap_or(4)
        });

        let batch = BatchResult {
            total_count: results.len(),
            critical_count,
            high_count,
            medium_count,
            low_count,
            results,
        };

        let duration = start.elapsed();
        if let Err(e) = self.telemetry.record_batch(&batch, duration) {
            warn!("Failed to emit batch telemetry: {}", e);
        }

        info!(
            "Batch analysis complete: {} databases in {}ms",
            batch.total_count,
            duration.as_millis()
        );
        Ok(batch)
    }

    /// A malformed request fails here, before dispatch, never mid-batch.
    fn validate(&self, request: &BatchAnalysisRequest) -> Result<()> {
        if request.db_identifiers.is_empty() {
            return Err(AppError::ValidationError(
                "At least one database identifier is required".to_string(),
            ));
        }

        if request.db_identifiers.len() > self.max_batch_size {
            return Err(AppError::ValidationError(format!(
                "Batch size {} exceeds maximum of {} databases. Split into multiple batches.",
                request.db_identifiers.len(),
                self.max_batch_size
            )));
        }

        if !ScenarioRegistry::builtin().exists(&request.scenario) {
            return Err(AppError::ValidationError(format!(
                "Invalid scenario: {}",
                request.scenario
            )));
        }

        for identifier in &request.db_identifiers {
            validate_identifier(identifier)?;
        }

        Ok(())
    }
}
