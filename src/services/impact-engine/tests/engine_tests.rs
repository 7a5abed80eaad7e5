//! HTTP-boundary tests for the impact engine: reasoner and config-source
//! error mapping, and one end-to-end analysis against mocked services.

use std::fs;
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use db_impact_shared::{AnalysisRequest, Severity};
use impact_engine_service::config::{ConfigSourceConfig, ContextConfig, ReasonerConfig};
use impact_engine_service::reasoner::{parse_impact_response, Reasoner};
use impact_engine_service::{
    AnalysisEngine, AppError, BusinessContextStore, ConfigResolver, NoopTelemetry, ReasoningClient,
};

const VERDICT_JSON: &str = r#"{
    "sla_violation": true,
    "rto_violation": true,
    "rpo_violation": true,
    "expected_outage_time_minutes": 87,
    "business_severity": "CRITICAL",
    "why": ["Multi-AZ disabled, snapshot restore required"],
    "recommendations": ["Enable Multi-AZ"],
    "confidence": 0.85
}"#;

fn reasoner_config(server: &MockServer) -> ReasonerConfig {
    ReasonerConfig {
        api_url: format!("{}/v1/messages", server.uri()),
        api_key: "test-key".to_string(),
        ..ReasonerConfig::default()
    }
}

fn source_config(server: &MockServer) -> ConfigSourceConfig {
    ConfigSourceConfig {
        base_url: server.uri(),
        ..ConfigSourceConfig::default()
    }
}

fn docs_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("SLA.md"), "99.9% availability for tier-1").unwrap();
    fs::write(dir.path().join("RTO_RPO_POLICY.md"), "RTO 30m, RPO 1h").unwrap();
    fs::write(
        dir.path().join("INCIDENT_HISTORY.md"),
        "2024-03-15: snapshot restore took 87 minutes",
    )
    .unwrap();
    dir
}

async fn mount_messages_reply(server: &MockServer, reply_text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": reply_text}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn reasoning_client_extracts_fenced_verdict() {
    let server = MockServer::start().await;
    let fenced = format!("Here you go:\n```json\n{}\n```", VERDICT_JSON);
    mount_messages_reply(&server, &fenced).await;

    let client = ReasoningClient::new(&reasoner_config(&server)).unwrap();
    let raw = client.infer("assess the database").await.unwrap();
    let result = parse_impact_response(&raw).unwrap();

    assert_eq!(result.business_severity, Severity::Critical);
    assert_eq!(result.expected_outage_time_minutes, 87);
}

#[tokio::test]
async fn reasoner_status_codes_map_onto_the_error_taxonomy() {
    for (status, expect_permission, expect_rate, expect_unavailable) in [
        (401, true, false, false),
        (403, true, false, false),
        (429, false, true, false),
        (500, false, false, true),
        (503, false, false, true),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let client = ReasoningClient::new(&reasoner_config(&server)).unwrap();
        let err = client.infer("assess the database").await.unwrap_err();

        match err {
            AppError::PermissionDenied(_) => assert!(expect_permission, "status {}", status),
            AppError::RateLimited(_) => assert!(expect_rate, "status {}", status),
            AppError::ServiceUnavailable(_) => assert!(expect_unavailable, "status {}", status),
            other => panic!("unexpected error for status {}: {:?}", status, other),
        }
    }
}

#[tokio::test]
async fn config_source_errors_stay_distinguishable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/instances/vanished-db"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/instances/locked-db"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let resolver = ConfigResolver::new(&source_config(&server)).unwrap();

    let err = resolver.resolve("vanished-db").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = resolver.resolve("locked-db").await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[tokio::test]
async fn describe_payload_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/instances/prod-billing-db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identifier": "prod-billing-db",
            "engine": "postgres",
            "instance_class": "db.r5.large",
            "multi_az": true,
            "backup_retention_days": 14,
            "allocated_storage": 250
        })))
        .mount(&server)
        .await;

    let resolver = ConfigResolver::new(&source_config(&server)).unwrap();
    let config = resolver.resolve("prod-billing-db").await.unwrap();

    // The source omitted PITR and the storage ceiling.
    assert!(config.pitr_enabled);
    assert_eq!(config.max_allocated_storage, 250);
    assert!(config.max_allocated_storage >= config.allocated_storage);
}

#[tokio::test]
async fn end_to_end_analysis_over_mocked_services() {
    let reasoner_server = MockServer::start().await;
    mount_messages_reply(&reasoner_server, VERDICT_JSON).await;

    let docs = docs_dir();
    let engine = AnalysisEngine::new(
        Arc::new(ConfigResolver::new(&ConfigSourceConfig::default()).unwrap()),
        Arc::new(BusinessContextStore::new(&ContextConfig {
            docs_dir: docs.path().to_path_buf(),
        })),
        Arc::new(ReasoningClient::new(&reasoner_config(&reasoner_server)).unwrap()),
        Arc::new(NoopTelemetry),
    );

    let request = AnalysisRequest {
        db_identifier: "prod-orders-db-01".to_string(),
        scenario: "primary_db_failure".to_string(),
    };
    let result = engine.analyze(&request).await.unwrap();

    assert_eq!(result.business_severity, Severity::Critical);
    assert!(result.sla_violation);
    assert!((0.0..=1.0).contains(&result.confidence));
}
