use axum::{
    extract::State,
    http::HeaderMap,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration, time::Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

mod analyzer;
mod batch;
mod cache;
mod config;
mod context;
mod error;
mod prompt;
mod reasoner;
mod resolver;
mod scenarios;
mod telemetry;
mod what_if;

use analyzer::AnalysisEngine;
use batch::BatchAnalyzer;
use cache::{CacheKey, ResultCache};
use config::Config;
use context::BusinessContextStore;
use error::{AppError, Result};
use reasoner::ReasoningClient;
use resolver::ConfigResolver;
use scenarios::ScenarioRegistry;
use telemetry::MetricsTelemetry;
use what_if::WhatIfEngine;

use db_impact_shared::{
    AnalysisRequest, BatchAnalysisRequest, BatchResult, ImpactResult, ScenarioSummary,
    WhatIfRequest, WhatIfResult,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<AnalysisEngine>,
    pub batch: Arc<BatchAnalyzer>,
    pub what_if: Arc<WhatIfEngine>,
    pub cache: Arc<ResultCache>,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "impact_engine=info,tower_http=debug".into()),
        )
        .init();

    info!("Starting Impact Engine Service");

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    config.validate()?;
    info!("Configuration loaded successfully");

    if config.api_key.is_none() {
        warn!("API_KEY is not set; requests are accepted without authentication");
    }

    if config.metrics_enabled {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .install()
            .map_err(|e| {
                AppError::ConfigurationError(format!("Failed to install metrics exporter: {}", e))
            })?;
        info!("Prometheus metrics exporter installed");
    }

    // Wire up the engine and its collaborators
    let resolver = Arc::new(ConfigResolver::new(&config.config_source)?);
    let context_store = Arc::new(BusinessContextStore::new(&config.context));
    let reasoning_client = Arc::new(ReasoningClient::new(&config.reasoner)?);
    let telemetry = Arc::new(MetricsTelemetry);

    let engine = Arc::new(AnalysisEngine::new(
        resolver.clone(),
        context_store,
        reasoning_client,
        telemetry.clone(),
    ));
    let batch = Arc::new(BatchAnalyzer::new(
        engine.clone(),
        telemetry.clone(),
        config.max_batch_size,
        config.batch_workers,
    ));
    let what_if = Arc::new(WhatIfEngine::new(
        engine.clone(),
        resolver,
        telemetry.clone(),
    ));
    let cache = Arc::new(ResultCache::new(Duration::from_secs(
        config.cache_ttl_seconds,
    )));
    info!("Analysis engine initialized");

    let state = AppState {
        config: config.clone(),
        engine,
        batch,
        what_if,
        cache,
        started_at: Instant::now(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        AppError::ConfigurationError(format!("Failed to bind {}: {}", addr, e))
    })?;
    info!("Impact Engine Service listening on {}", addr);

    // Graceful shutdown
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Server error: {}", e)))?;

    info!("Impact Engine Service shut down gracefully");
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/scenarios", get(list_scenarios))
        .route("/v1/analyze", post(analyze_database))
        .route("/v1/analyze/batch", post(analyze_batch))
        .route("/v1/analyze/what-if", post(analyze_what_if))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    api_key_middleware,
                )),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

// List the scenario catalog
async fn list_scenarios() -> Json<Vec<ScenarioSummary>> {
    Json(ScenarioRegistry::builtin().list())
}

// Run a single impact analysis, memoized per (identifier, scenario)
async fn analyze_database(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<ImpactResult>> {
    info!(
        "Received analysis request for db={}, scenario={}",
        request.db_identifier, request.scenario
    );

    let key = CacheKey {
        identifier: request.db_identifier.clone(),
        scenario: request.scenario.clone(),
    };
    let engine = state.engine.clone();
    let result = state
        .cache
        .get_or_compute(key, || async move { engine.analyze(&request).await })
        .await?;

    Ok(Json(result))
}

// Run one scenario against a batch of databases
async fn analyze_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchAnalysisRequest>,
) -> Result<Json<BatchResult>> {
    info!(
        "Received batch analysis request for {} databases",
        request.db_identifiers.len()
    );

    let batch = state.batch.analyze_batch(&request).await?;
    Ok(Json(batch))
}

// Run a baseline vs. modified-configuration differential analysis
async fn analyze_what_if(
    State(state): State<AppState>,
    Json(request): Json<WhatIfRequest>,
) -> Result<Json<WhatIfResult>> {
    info!(
        "Received what-if request for db={}, overrides={:?}",
        request.db_identifier,
        request.config_overrides.keys().collect::<Vec<_>>()
    );

    let result = state.what_if.what_if(&request).await?;
    Ok(Json(result))
}

// Static API key check; the health endpoint stays open for probes
async fn api_key_middleware(
    State(state): State<AppState>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    if let Err(e) = require_api_key(req.headers(), state.config.api_key.as_deref()) {
        return e.into_response();
    }

    next.run(req).await
}

fn require_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AppError::Unauthorized("Invalid API key".to_string())),
        None => Err(AppError::Unauthorized("Missing x-api-key header".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_check_accepts_matching_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("secret"));
        assert!(require_api_key(&headers, Some("secret")).is_ok());
    }

    #[test]
    fn api_key_check_rejects_missing_or_wrong_key() {
        let headers = HeaderMap::new();
        assert!(matches!(
            require_api_key(&headers, Some("secret")),
            Err(AppError::Unauthorized(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("nope"));
        assert!(matches!(
            require_api_key(&headers, Some("secret")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn api_key_check_is_disabled_without_configured_key() {
        let headers = HeaderMap::new();
        assert!(require_api_key(&headers, None).is_ok());
    }
}
