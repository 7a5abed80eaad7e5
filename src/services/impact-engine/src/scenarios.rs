//! Static catalog of failure scenarios.
//!
//! Each scenario carries descriptive guidance text that the prompt assembler
//! injects verbatim; the registry never holds executable logic. Scenario
//! guidance may only reference database configuration fields and the
//! business documents, never application internals.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use db_impact_shared::ScenarioSummary;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct ScenarioDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Scenario-specific analysis guidance injected into the prompt.
    pub guidance: &'static str,
    /// Configuration fields the analysis depends on.
    pub required_fields: &'static [&'static str],
    pub tags: &'static [&'static str],
}

pub struct ScenarioRegistry {
    scenarios: HashMap<&'static str, ScenarioDefinition>,
}

impl ScenarioRegistry {
    /// The process-wide registry, built once and read-only thereafter.
    pub fn builtin() -> &'static ScenarioRegistry {
        &REGISTRY
    }

    pub fn lookup(&self, id: &str) -> Result<&ScenarioDefinition> {
        self.scenarios
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Scenario not found: {}", id)))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.scenarios.contains_key(id)
    }

    pub fn list(&self) -> Vec<ScenarioSummary> {
        let mut summaries: Vec<ScenarioSummary> = self
            .scenarios
            .values()
            .map(|s| ScenarioSummary {
                id: s.id.to_string(),
                name: s.name.to_string(),
                description: s.description.to_string(),
                tags: s.tags.iter().map(|t| t.to_string()).collect(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}

static REGISTRY: Lazy<ScenarioRegistry> = Lazy::new(|| {
    let mut scenarios = HashMap::new();
    for scenario in BUILTIN_SCENARIOS {
        scenarios.insert(scenario.id, scenario.clone());
    }
    ScenarioRegistry { scenarios }
});

const BUILTIN_SCENARIOS: &[ScenarioDefinition] = &[
    ScenarioDefinition {
        id: "primary_db_failure",
        name: "Primary Database Failure",
        description: "Analyzes impact when the primary DB instance fails completely (hardware failure, AZ outage, etc.)",
        guidance: r#"SCENARIO: Primary database instance has failed completely (hardware failure, AZ outage, or critical error).

ANALYSIS REQUIRED:
1. Check Multi-AZ configuration to determine failover capability:
   - Multi-AZ ENABLED -> Automatic failover to standby in a different AZ
     * Historical data shows Multi-AZ failovers complete in <5 minutes
     * Estimate RTO: 3-5 minutes based on past incidents
     * Data loss: none (synchronous replication)

   - Multi-AZ DISABLED -> Manual recovery required via snapshot restore
     * Historical data shows snapshot restores take 60-90 minutes for db.m5.large instances
     * Must create a new instance and restore from the most recent backup
     * Estimate RTO: 60-120 minutes based on instance class and past incidents
     * Data loss: time since last backup (if PITR disabled)

2. Assess RPO (data loss) based on backup configuration:
   - PITR ENABLED -> Can restore to any second within the retention period
     * Data loss: seconds to minutes (transaction logs captured continuously)

   - PITR DISABLED -> Can only restore to snapshot time
     * Snapshots typically run once daily (usually overnight)
     * Data loss: hours up to 24 hours depending on when the failure occurred

3. Compare recovery time against the RTO policy:
   - If Multi-AZ disabled AND RTO policy is <30 minutes -> RTO violation
   - If Multi-AZ enabled AND RTO policy is <10 minutes -> may still violate (failover takes 3-5 min)

4. Compare data loss against the RPO policy:
   - If PITR disabled AND RPO policy is <1 hour -> RPO violation likely
   - If PITR enabled -> RPO typically met (seconds of data loss)

CRITICAL QUESTIONS TO ANSWER:
- Will this failure violate SLA thresholds based on expected downtime?
- Does the estimated RTO exceed the acceptable recovery time from the RTO policy?
- Does the estimated RPO exceed the acceptable data loss from the RPO policy?
- What is the database-level severity (CRITICAL/HIGH/MEDIUM/LOW) based on:
  * Multi-AZ configuration (disabled = higher severity)
  * PITR configuration (disabled = higher data loss risk)
  * Business criticality from SLA policies
  * Historical incident patterns

RECOMMENDATIONS (prioritize by impact):
- If Multi-AZ disabled: enable Multi-AZ to reduce RTO from 60-90 min to <5 min
- If PITR disabled: enable PITR to reduce RPO from hours to seconds
- If backup retention <7 days AND compliance requirements exist: increase retention
- If the instance class is small: consider a larger instance for faster backup/restore"#,
        required_fields: &["multi_az", "pitr_enabled", "backup_retention_days", "instance_class"],
        tags: &["availability", "disaster-recovery", "critical"],
    },
    ScenarioDefinition {
        id: "replica_lag",
        name: "Read Replica Lag",
        description: "Analyzes impact when read replicas experience significant replication lag (>5 minutes behind primary)",
        guidance: r#"SCENARIO: Read replicas are experiencing significant replication lag (>5 minutes behind the primary database).

ANALYSIS REQUIRED:
1. Check the read replica configuration:
   - Number of read replicas available
   - Single replica = higher risk (if it lags, all read traffic is affected)
   - Multiple replicas = can potentially route around the lagging replica

2. Assess the database-level impact of stale data:
   - Read-heavy workloads will receive stale data (>5 minutes old)
   - Write operations to the primary are NOT affected (lag is one-way)
   - Applications reading from replicas may show inconsistent data

3. Review historical patterns from the incident history:
   - Check whether past replica-lag incidents are documented
   - Estimate resolution time from historical data
   - If no historical data: replica lag typically resolves in 10-30 minutes

4. Evaluate severity against business policies:
   - If the SLA requires "real-time data" or "eventual consistency <1 min" -> SLA violation
   - Development/analytics workloads -> lower severity (stale data acceptable)

5. Assess whether lag affects availability:
   - The primary database is still operational (writes continue)
   - Only read operations are affected
   - Typically MEDIUM severity unless the business requires real-time reads

CRITICAL QUESTIONS TO ANSWER:
- Does the replication lag duration violate data consistency SLAs from the business policies?
- What is the database-level severity (CRITICAL/HIGH/MEDIUM/LOW) based on:
  * Number of replicas (fewer = higher risk)
  * Business data-freshness requirements from SLA policies
  * Historical lag incident resolution times
- Will applications fail or show incorrect data due to staleness?
- Is this a temporary spike or sustained lag (affects urgency)?

RECOMMENDATIONS:
- If single replica: add additional read replicas for redundancy
- If sustained lag: investigate primary database load and optimize queries
- If lag is recurring: consider vertical scaling of the replica instance class
- If the business requires real-time reads: route critical reads to the primary
- Monitor replication lag metrics and alert at a 2-minute threshold"#,
        required_fields: &["read_replicas", "instance_class", "engine"],
        tags: &["performance", "read-scaling", "data-consistency"],
    },
    ScenarioDefinition {
        id: "backup_failure",
        name: "Backup Failure",
        description: "Analyzes impact when automated backups fail or the latest backup is corrupted/unusable",
        guidance: r#"SCENARIO: Automated database backups have failed, or the latest backup is corrupted and unusable.

ANALYSIS REQUIRED:
1. Assess current exposure if the primary database fails NOW:
   - With no recent backup: must rely on an older backup (data loss = time since last good backup)
   - If PITR enabled: transaction logs may still allow point-in-time recovery (partial mitigation)
   - If PITR disabled: complete data loss back to the last successful backup

2. Calculate the maximum data loss exposure (RPO):
   - Check backup_retention_days to find the age of the last known-good backup
   - If the last good backup is 2+ days old -> potential data loss of 48+ hours
   - Compare against the RPO policy threshold (typically 1-4 hours for production DBs)

3. Evaluate recovery capability:
   - Multi-AZ still provides failover but does not protect against data corruption
   - If the primary fails AND the backup is unusable -> catastrophic data loss scenario
   - If PITR is enabled: can recover to any point using transaction logs

4. Check compliance and regulatory requirements:
   - Backup failures may violate compliance policies (SOC2, HIPAA, GDPR, etc.)
   - Some industries require daily successful backups by regulation

5. Assess urgency and severity:
   - If PITR enabled: backup failure is less critical (recent recovery points remain)
     * Severity: HIGH (not CRITICAL) - has a safety net
   - If PITR disabled: backup failure is catastrophic
     * Data loss = time since the last successful backup
     * Severity: CRITICAL - no safety net
   - CRITICAL if: production database + no PITR + strict RPO policy (<1 hour)
   - MEDIUM if: development/staging database + recent backups exist

CRITICAL QUESTIONS TO ANSWER:
- What is the maximum potential data loss (RPO) if the primary fails right now?
- Does this backup failure violate backup/recovery SLAs from the business policies?
- What is the severity (CRITICAL/HIGH/MEDIUM/LOW) based on:
  * Age of the last known-good backup
  * PITR status (enabled = partial mitigation)
  * Business criticality tier from SLA policies
  * Compliance requirements
- Are alternative recovery mechanisms available (PITR, read replicas)?

RECOMMENDATIONS (prioritize by urgency):
- URGENT: investigate and fix the backup failure immediately (disk space, permissions, backup window)
- If PITR disabled: enable PITR immediately as a safety net while fixing backups
- If compliance-critical: notify the compliance team and document the incident
- If backup retention is low (<7 days): increase retention for a wider recovery window
- Implement backup monitoring and alerting (alert on the first failure)
- Test backup restoration regularly to catch corruption early"#,
        required_fields: &["backup_retention_days", "pitr_enabled", "multi_az"],
        tags: &["disaster-recovery", "compliance", "data-protection", "critical"],
    },
    ScenarioDefinition {
        id: "storage_pressure",
        name: "Storage Pressure",
        description: "Analyzes impact when database storage utilization reaches 85%+ of allocated capacity",
        guidance: r#"SCENARIO: Database storage utilization has reached 85%+ of allocated capacity.

ANALYSIS REQUIRED:
1. Calculate remaining capacity and urgency:
   - Check allocated_storage and assume 85%+ utilization (15% headroom left)
   - If max_allocated_storage is set AND not yet reached -> autoscaling will trigger
   - If max_allocated_storage is NOT set OR already at max -> manual intervention required

2. Estimate time until storage exhaustion:
   - Exact time cannot be calculated (growth-rate metrics are not available here)
   - Generic severity assessment: 85% = WARNING, 90%+ = CRITICAL
   - Active databases typically grow 5-10% per month; at 85% estimate days to weeks until full

3. Assess the impact when storage reaches 100%:
   - Write operations FAIL (the database cannot accept new data)
   - Read operations continue to work
   - The database may crash or become unresponsive
   - Transaction logs may fill up, causing replication lag or failure
   - Backups may fail (snapshots need space)
   - CRITICAL severity if this occurs

4. Check the autoscaling configuration:
   - If max_allocated_storage > allocated_storage -> storage will auto-scale before 100%
     * Auto-scaling triggers at ~90% utilization or 10GB free (whichever is less)
     * Reduces urgency to MEDIUM (the system will self-heal)
   - If max_allocated_storage is NOT set OR already at maximum -> HIGH/CRITICAL urgency
     * Manual intervention required immediately

5. Evaluate business impact severity:
   - Storage exhaustion = database outage = SLA violation
   - Compare against the RTO policy: manual storage expansion takes 15-30 minutes
   - If autoscaling enabled: no expected outage (seamless expansion)

CRITICAL QUESTIONS TO ANSWER:
- How soon until storage is exhausted (hours/days/weeks at 85% utilization)?
- Will storage exhaustion cause a database outage and write failures?
- Does this violate availability SLAs from the business policies?
- What is the severity (CRITICAL/HIGH/MEDIUM/LOW) based on:
  * Current utilization percentage
  * Autoscaling configuration (enabled = lower severity)
  * Business criticality tier from SLA policies
- Is autoscaling configured, or is manual intervention required?

RECOMMENDATIONS (prioritize by urgency):
- If max_allocated_storage is NOT set: enable storage autoscaling immediately
  * Set max_allocated_storage to 2-3x the current allocated_storage
- If already at max_allocated_storage: increase the limit or upgrade the storage type
- If 90%+ utilized: URGENT manual expansion required (do not wait for autoscaling)
- Long-term: implement storage monitoring and alerting at a 70% threshold
- Long-term: investigate growth patterns and archive or purge old data"#,
        required_fields: &["allocated_storage", "max_allocated_storage", "engine", "instance_class"],
        tags: &["capacity", "availability", "operational"],
    },
];
