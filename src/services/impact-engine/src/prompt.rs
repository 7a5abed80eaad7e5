//! Prompt assembly for the reasoning service.
//!
//! `build_prompt` is a pure function: the same request, configuration,
//! scenario and policy text always produce byte-identical output, which
//! keeps the prompt golden-testable. All domain knowledge the reasoner
//! needs (Multi-AZ, PITR, retention, autoscaling semantics) is embedded in
//! the feature reference block so it depends on no outside knowledge.

use db_impact_shared::{AnalysisRequest, DatabaseConfig};

use crate::scenarios::ScenarioDefinition;

/// Domain semantics of the configuration features, rendered into every
/// prompt.
const FEATURE_REFERENCE: &str = r#"FEATURE REFERENCE:
- Multi-AZ: synchronous replication to a standby instance in a different
  availability zone with automatic failover. Failover completes in minutes
  and loses no committed data. Without Multi-AZ, recovery from an instance
  failure requires a manual restore from backup.
- PITR (point-in-time recovery): continuous transaction-log capture allowing
  restore to any second within the retention window. Without PITR, restores
  are limited to the most recent snapshot, typically taken once daily.
- Backup retention: number of days automated backups are kept. Retention of
  0 disables automated backups entirely.
- Storage autoscaling: when the maximum allocated storage exceeds the
  current allocation, storage grows automatically before exhaustion; when
  the two are equal, exhaustion requires manual intervention.
- Read replicas: asynchronous copies serving read traffic. They do not
  participate in failover automatically and may lag behind the primary."#;

/// Strict output contract demanded from the reasoner.
const OUTPUT_REQUIREMENTS: &str = r#"OUTPUT REQUIREMENTS:

Return ONLY valid JSON matching this exact schema:

{
  "sla_violation": boolean,
  "rto_violation": boolean,
  "rpo_violation": boolean,
  "expected_outage_time_minutes": integer >= 0,
  "business_severity": "LOW" | "MEDIUM" | "HIGH" | "CRITICAL",
  "why": [array of strings explaining your reasoning],
  "recommendations": [array of strings with actionable fixes],
  "confidence": float between 0.0 and 1.0
}

REASONING RULES:
- Base predictions on the ACTUAL configuration provided (not generic best practices)
- Use historical incident data to estimate recovery times:
  * PRIORITIZE specific incident times over general ranges
  * If only ranges are given, use the upper bound or average depending on confidence
  * Never estimate lower than observed historical times
- Compare predicted recovery time against the RTO/RPO policies
- Explain your reasoning clearly in the "why" array

CONFIDENCE GUIDELINES:
- High (0.8-1.0): direct historical data for this exact scenario
- Medium (0.6-0.79): can extrapolate from similar scenarios
- Low (<0.6): missing critical data

Return ONLY the JSON, no additional text."#;

/// Assemble the full reasoning prompt.
///
/// `baseline` is present only for the what-if leg of a differential
/// analysis; it prepends a delta block binding the reasoner to the
/// modified configuration's recovery mechanisms.
pub fn build_prompt(
    request: &AnalysisRequest,
    config: &DatabaseConfig,
    scenario: &ScenarioDefinition,
    business_context: &str,
    baseline: Option<&DatabaseConfig>,
) -> String {
    let mut prompt = String::new();

    if let Some(baseline) = baseline {
        prompt.push_str(&delta_block(baseline, config));
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!(
        r#"You are an expert Site Reliability Engineer analyzing database failure scenarios.

TASK:
Assess the impact if database "{}" experiences the scenario "{}".

You must answer these 5 critical questions:
1. sla_violation: Will this failure breach our SLA commitments? (true/false)
2. rto_violation: Will recovery time exceed our RTO policy? (true/false)
3. rpo_violation: Will data loss exceed our RPO policy? (true/false)
4. expected_outage_time_minutes: How long will we be down? (integer)
5. business_severity: How critical is this? (LOW/MEDIUM/HIGH/CRITICAL)
"#,
        request.db_identifier, request.scenario
    ));

    prompt.push_str("\n---\n");
    prompt.push_str(FEATURE_REFERENCE);

    prompt.push_str("\n\n---\n");
    prompt.push_str(scenario.guidance);

    prompt.push_str("\n\n---\nDATABASE CONFIGURATION:\n");
    prompt.push_str(&render_db_config(config));

    prompt.push_str("\n---\nBUSINESS POLICIES & HISTORICAL DATA:\n");
    prompt.push_str(business_context);

    prompt.push_str("\n\n---\n");
    prompt.push_str(OUTPUT_REQUIREMENTS);

    prompt
}

/// Render the configuration snapshot for the prompt.
fn render_db_config(config: &DatabaseConfig) -> String {
    let engine = match &config.engine_version {
        Some(version) => format!("{} {}", config.engine, version),
        None => config.engine.clone(),
    };
    let replicas = if config.read_replicas.is_empty() {
        "none".to_string()
    } else {
        config.read_replicas.join(", ")
    };

    format!(
        r#"Database: {}
Engine: {}
Instance Class: {}
Multi-AZ: {}
PITR: {}
Backup Retention: {} days
Allocated Storage: {} GB (ceiling {} GB, autoscaling {})
Read Replicas: {}
Storage Encrypted: {}
Auto Minor Version Upgrade: {}
"#,
        config.identifier,
        engine,
        config.instance_class,
        enabled(config.multi_az),
        enabled(config.pitr_enabled),
        config.backup_retention_days,
        config.allocated_storage,
        config.max_allocated_storage,
        enabled(config.autoscaling_enabled()),
        replicas,
        yes_no(config.storage_encrypted),
        yes_no(config.auto_minor_version_upgrade),
    )
}

/// Field-by-field changes between the baseline and modified configuration,
/// plus the instruction pinning the reasoner to the modified state.
fn delta_block(baseline: &DatabaseConfig, modified: &DatabaseConfig) -> String {
    let mut changes = Vec::new();

    push_change(&mut changes, "engine", &baseline.engine, &modified.engine);
    push_change(
        &mut changes,
        "engine_version",
        &option_label(&baseline.engine_version),
        &option_label(&modified.engine_version),
    );
    push_change(
        &mut changes,
        "instance_class",
        &baseline.instance_class,
        &modified.instance_class,
    );
    push_change(
        &mut changes,
        "multi_az",
        &baseline.multi_az.to_string(),
        &modified.multi_az.to_string(),
    );
    push_change(
        &mut changes,
        "backup_retention_days",
        &baseline.backup_retention_days.to_string(),
        &modified.backup_retention_days.to_string(),
    );
    push_change(
        &mut changes,
        "pitr_enabled",
        &baseline.pitr_enabled.to_string(),
        &modified.pitr_enabled.to_string(),
    );
    push_change(
        &mut changes,
        "allocated_storage",
        &baseline.allocated_storage.to_string(),
        &modified.allocated_storage.to_string(),
    );
    push_change(
        &mut changes,
        "max_allocated_storage",
        &baseline.max_allocated_storage.to_string(),
        &modified.max_allocated_storage.to_string(),
    );
    push_change(
        &mut changes,
        "read_replicas",
        &baseline.read_replicas.join(","),
        &modified.read_replicas.join(","),
    );
    push_change(
        &mut changes,
        "storage_encrypted",
        &baseline.storage_encrypted.to_string(),
        &modified.storage_encrypted.to_string(),
    );
    push_change(
        &mut changes,
        "auto_minor_version_upgrade",
        &baseline.auto_minor_version_upgrade.to_string(),
        &modified.auto_minor_version_upgrade.to_string(),
    );

    let listed = if changes.is_empty() {
        "- (no fields differ from the baseline)".to_string()
    } else {
        changes.join("\n")
    };

    format!(
        r#"WHAT-IF ANALYSIS - CONFIGURATION CHANGES UNDER EVALUATION:

The following fields differ between the current (baseline) configuration and
the hypothetical (modified) configuration you are assessing:

{}

You are assessing the MODIFIED configuration. Select the recovery mechanism
implied by the modified state only: for example, if multi_az becomes true,
assume automatic failover timing, not the baseline's manual restore path.
Do NOT cite historical outage figures that only apply to the baseline
configuration."#,
        listed
    )
}

fn push_change(changes: &mut Vec<String>, field: &str, baseline: &str, modified: &str) {
    if baseline != modified {
        changes.push(format!("- {}: {} -> {}", field, baseline, modified));
    }
}

fn option_label(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "unset".to_string())
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
