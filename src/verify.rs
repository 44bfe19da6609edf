// 🔍 Verifier - independent audit pass over persisted runs
//
// Reads only what a run left on disk. Checks run in a fixed order because
// later checks assume earlier ones held:
//   artifacts → line shape → fields → cardinality → lineage
//   → semantics → plan chains → audit parity → (batch) cross-run variation
//
// The first violation fails the pass; nothing is repaired.

use crate::config::TEXT_ARTIFACTS;
use crate::trace::{
    audit_id_for, read_audit_records, DecisionGraph, DecisionPayload, DecisionType, GraphError, TraceRecord,
    AUDIT_FILE, REQUIRED_FIELDS, TRACE_FILE,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Strings that mark stub content leaking into a trace
pub const FORBIDDEN_PLACEHOLDER_TOKENS: [&str; 6] =
    ["Plan A", "Plan B", "Plan C", "Option 1", "Option 2", "Option 3"];

/// Event counts every run must match exactly
pub const EXPECTED_CARDINALITY: [(DecisionType, usize); 5] = [
    (DecisionType::PlanProposed, 3),
    (DecisionType::PlanEvaluatedPolicy, 3),
    (DecisionType::PlanEvaluatedRisk, 3),
    (DecisionType::FinalPlanSelected, 1),
    (DecisionType::BudgetPlanPublished, 1),
];

const POLICY_CHECK_STATUSES: [&str; 2] = ["PASS", "FAIL"];
const RISK_CHECK_STATUSES: [&str; 3] = ["PASS", "WARN", "FAIL"];

// ============================================================================
// ERRORS
// ============================================================================

/// One named assertion per invariant. Every variant names the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
    #[error("[{run}] missing run output directory {path}")]
    MissingRunDirectory { run: String, path: PathBuf },

    #[error("[{run}] missing required artifact {path}")]
    MissingArtifact { run: String, path: PathBuf },

    #[error("[{run}] line {line} of the trace is not a JSON object: {reason}")]
    MalformedTraceLine { run: String, line: usize, reason: String },

    #[error("[{run}] line {line} is missing required field {field}")]
    MissingField { run: String, line: usize, field: String },

    #[error("[{run}] line {line}: lineage must be a list")]
    LineageNotSequence { run: String, line: usize },

    #[error("[{run}] expected {expected} {decision_type} events, found {found}")]
    CardinalityMismatch {
        run: String,
        decision_type: DecisionType,
        expected: usize,
        found: usize,
    },

    #[error("[{run}] decision id {decision_id} appears more than once")]
    DuplicateDecisionId { run: String, decision_id: String },

    #[error("[{run}] event {decision_id} references unknown lineage decision_id {parent}")]
    DanglingLineage { run: String, decision_id: String, parent: String },

    #[error("[{run}] event {decision_id} references parent {parent} emitted after it")]
    ForwardLineage { run: String, decision_id: String, parent: String },

    #[error("[{run}] event {decision_id} breaks the single-root rule")]
    RootLineage { run: String, decision_id: String },

    #[error("[{run}] event {decision_id} contains placeholder content '{token}'")]
    PlaceholderContent { run: String, decision_id: String, token: String },

    #[error("[{run}] {decision_type} event {decision_id} must include non-empty reason_codes")]
    EmptyReasonCodes {
        run: String,
        decision_id: String,
        decision_type: DecisionType,
    },

    #[error("[{run}] event {decision_id} has invalid check status '{status}'")]
    InvalidCheckStatus { run: String, decision_id: String, status: String },

    #[error("[{run}] planner must emit tie_breakers_applied")]
    MissingTieBreakers { run: String },

    #[error("[{run}] planner must emit rationale")]
    MissingRationale { run: String },

    #[error("[{run}] planner must emit candidate_comparison_summary")]
    MissingComparisonSummary { run: String },

    #[error("[{run}] {decision_type} event {decision_id} does not match its payload shape: {reason}")]
    PayloadShape {
        run: String,
        decision_id: String,
        decision_type: DecisionType,
        reason: String,
    },

    #[error("[{run}] plan chain broken: {reason}")]
    BrokenPlanChain { run: String, reason: String },

    #[error("[{run}] audit trail does not match the structured trace: {reason}")]
    AuditMismatch { run: String, reason: String },

    #[error("persona variation invariant failed across {runs} runs: selected plans and drivers are identical")]
    NoCrossRunVariation { runs: usize },
}

pub type VerificationResult<T> = Result<T, VerificationError>;

/// What a passing run contributes to the batch checks
#[derive(Debug, Clone, PartialEq)]
pub struct RunVerification {
    pub run: String,
    pub events: usize,
    pub selected_plan_name: String,
    pub top_drivers: Vec<String>,
}

// ============================================================================
// RUN CHECKS
// ============================================================================

/// Verify one run directory
pub fn verify_run(run_dir: &Path, run: &str) -> VerificationResult<RunVerification> {
    check_artifacts(run_dir, run)?;

    let values = read_trace_values(&run_dir.join(TRACE_FILE), run)?;
    check_fields(&values, run)?;
    let records = parse_records(&values, run)?;

    check_cardinality(&records, run)?;
    let graph = check_lineage(&records, run)?;
    check_semantics(&records, run)?;
    check_plan_chains(&graph, run)?;
    check_audit_parity(&records, &run_dir.join(AUDIT_FILE), run)?;

    let verification = RunVerification {
        run: run.to_string(),
        events: records.len(),
        selected_plan_name: selected_plan_name(&records),
        top_drivers: top_driver_categories(&records),
    };
    info!(run, events = verification.events, "run verified");
    Ok(verification)
}

pub fn check_artifacts(run_dir: &Path, run: &str) -> VerificationResult<()> {
    if !run_dir.is_dir() {
        return Err(VerificationError::MissingRunDirectory {
            run: run.to_string(),
            path: run_dir.to_path_buf(),
        });
    }

    for artifact in TEXT_ARTIFACTS {
        let path = run_dir.join(artifact);
        if !path.is_file() {
            return Err(VerificationError::MissingArtifact {
                run: run.to_string(),
                path,
            });
        }
    }
    Ok(())
}

/// Non-blank trace lines, each required to be a JSON object
pub fn read_trace_values(trace_path: &Path, run: &str) -> VerificationResult<Vec<Value>> {
    let content = fs::read_to_string(trace_path).map_err(|e| VerificationError::MalformedTraceLine {
        run: run.to_string(),
        line: 0,
        reason: e.to_string(),
    })?;

    let mut values = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |reason: String| VerificationError::MalformedTraceLine {
            run: run.to_string(),
            line: index + 1,
            reason,
        };

        let value: Value = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
        if !value.is_object() {
            return Err(malformed("expected an object".to_string()));
        }
        values.push(value);
    }
    Ok(values)
}

pub fn check_fields(values: &[Value], run: &str) -> VerificationResult<()> {
    for (index, value) in values.iter().enumerate() {
        for field in REQUIRED_FIELDS {
            if value.get(field).is_none() {
                return Err(VerificationError::MissingField {
                    run: run.to_string(),
                    line: index + 1,
                    field: field.to_string(),
                });
            }
        }
        if !value["lineage"].is_array() {
            return Err(VerificationError::LineageNotSequence {
                run: run.to_string(),
                line: index + 1,
            });
        }
    }
    Ok(())
}

/// Typed view of the trace; a line that fails here has the wrong shape
fn parse_records(values: &[Value], run: &str) -> VerificationResult<Vec<TraceRecord>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value.clone()).map_err(|e| VerificationError::MalformedTraceLine {
                run: run.to_string(),
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

pub fn check_cardinality(records: &[TraceRecord], run: &str) -> VerificationResult<()> {
    let mut counts: BTreeMap<DecisionType, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.decision_type).or_insert(0) += 1;
    }

    for (decision_type, expected) in EXPECTED_CARDINALITY {
        let found = counts.get(&decision_type).copied().unwrap_or(0);
        if found != expected {
            return Err(VerificationError::CardinalityMismatch {
                run: run.to_string(),
                decision_type,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Rebuild the lineage DAG; later checks walk it
pub fn check_lineage<'a>(records: &'a [TraceRecord], run: &str) -> VerificationResult<DecisionGraph<'a>> {
    let run = run.to_string();
    match DecisionGraph::from_records(records) {
        Ok(graph) => Ok(graph),
        Err(GraphError::Empty) => Err(VerificationError::RootLineage {
            run,
            decision_id: String::new(),
        }),
        Err(GraphError::DuplicateId(decision_id)) => Err(VerificationError::DuplicateDecisionId { run, decision_id }),
        Err(GraphError::MissingRoot(decision_id)) | Err(GraphError::ExtraRoot(decision_id)) => {
            Err(VerificationError::RootLineage { run, decision_id })
        }
        Err(GraphError::DanglingParent { child, parent }) => Err(VerificationError::DanglingLineage {
            run,
            decision_id: child,
            parent,
        }),
        Err(GraphError::ForwardReference { child, parent }) => Err(VerificationError::ForwardLineage {
            run,
            decision_id: child,
            parent,
        }),
    }
}

/// First forbidden token found in any string value
fn find_placeholder(value: &Value) -> Option<&'static str> {
    match value {
        Value::String(s) => FORBIDDEN_PLACEHOLDER_TOKENS.iter().copied().find(|t| s.contains(t)),
        Value::Array(items) => items.iter().find_map(find_placeholder),
        Value::Object(map) => map.values().find_map(find_placeholder),
        _ => None,
    }
}

fn non_empty(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        _ => false,
    }
}

fn check_reason_codes(record: &TraceRecord, allowed: &[&str], run: &str) -> VerificationResult<()> {
    let reason_codes = record.evidence.get("reason_codes");
    if !non_empty(reason_codes) {
        return Err(VerificationError::EmptyReasonCodes {
            run: run.to_string(),
            decision_id: record.decision_id.clone(),
            decision_type: record.decision_type,
        });
    }

    let checks = reason_codes.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    for check in checks {
        let status = check.get("status").and_then(Value::as_str).unwrap_or("");
        if !allowed.contains(&status) {
            return Err(VerificationError::InvalidCheckStatus {
                run: run.to_string(),
                decision_id: record.decision_id.clone(),
                status: status.to_string(),
            });
        }
    }
    Ok(())
}

pub fn check_semantics(records: &[TraceRecord], run: &str) -> VerificationResult<()> {
    for record in records {
        let token = serde_json::to_value(record).ok().as_ref().and_then(find_placeholder);
        if let Some(token) = token {
            return Err(VerificationError::PlaceholderContent {
                run: run.to_string(),
                decision_id: record.decision_id.clone(),
                token: token.to_string(),
            });
        }

        match record.decision_type {
            DecisionType::PlanEvaluatedPolicy => check_reason_codes(record, &POLICY_CHECK_STATUSES, run)?,
            DecisionType::PlanEvaluatedRisk => check_reason_codes(record, &RISK_CHECK_STATUSES, run)?,
            DecisionType::FinalPlanSelected => {
                let evidence = &record.evidence;
                if !non_empty(evidence.get("tie_breakers_applied")) {
                    return Err(VerificationError::MissingTieBreakers { run: run.to_string() });
                }
                if !non_empty(evidence.get("rationale")) {
                    return Err(VerificationError::MissingRationale { run: run.to_string() });
                }
                if !non_empty(evidence.get("candidate_comparison_summary")) {
                    return Err(VerificationError::MissingComparisonSummary { run: run.to_string() });
                }
            }
            _ => {}
        }

        DecisionPayload::from_maps(record.decision_type, &record.context, &record.evidence, &record.outcome)
            .map_err(|e| VerificationError::PayloadShape {
                run: run.to_string(),
                decision_id: record.decision_id.clone(),
                decision_type: record.decision_type,
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

fn field_str<'v>(map: &'v serde_json::Map<String, Value>, key: &str) -> &'v str {
    map.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Every proposal runs proposal → policy → risk on its own branch, the
/// selection hangs off the risk event of the plan it names, and the
/// publication hangs off the selection.
pub fn check_plan_chains(graph: &DecisionGraph<'_>, run: &str) -> VerificationResult<()> {
    let broken = |reason: String| VerificationError::BrokenPlanChain {
        run: run.to_string(),
        reason,
    };
    let expected = [
        DecisionType::PlanProposed,
        DecisionType::PlanEvaluatedPolicy,
        DecisionType::PlanEvaluatedRisk,
    ];

    let chains = graph.plan_chains();
    let expected_chains = EXPECTED_CARDINALITY[0].1;
    if chains.len() != expected_chains {
        return Err(broken(format!("{} plan chains, expected {}", chains.len(), expected_chains)));
    }

    for chain in &chains {
        let proposal = chain[0];
        let plan_id = field_str(&proposal.evidence, "plan_id");

        let stages: Vec<DecisionType> = chain.iter().take(expected.len()).map(|r| r.decision_type).collect();
        if stages != expected {
            return Err(broken(format!("proposal {} does not lead to its policy and risk evaluations", plan_id)));
        }

        let from_drivers = graph
            .parents(&proposal.decision_id)
            .iter()
            .all(|p| p.decision_type == DecisionType::TopDriversIdentified);
        if !from_drivers {
            return Err(broken(format!("proposal {} is not derived from the top drivers", plan_id)));
        }

        if let Some(stray) = chain[1..expected.len()]
            .iter()
            .find(|r| field_str(&r.context, "plan_id") != plan_id)
        {
            return Err(broken(format!(
                "{} event {} evaluates a different plan than proposal {}",
                stray.decision_type, stray.decision_id, plan_id
            )));
        }
    }

    let selection = graph
        .of_type(DecisionType::FinalPlanSelected)
        .into_iter()
        .next()
        .ok_or_else(|| broken("no selection event".to_string()))?;
    let selected_plan_id = field_str(&selection.outcome, "selected_plan_id");

    let from_selected_risk = graph.parents(&selection.decision_id).iter().all(|p| {
        p.decision_type == DecisionType::PlanEvaluatedRisk && field_str(&p.context, "plan_id") == selected_plan_id
    });
    if !from_selected_risk {
        return Err(broken(format!(
            "selection {} is not derived from the risk evaluation of {}",
            selection.decision_id, selected_plan_id
        )));
    }

    for publication in graph.of_type(DecisionType::BudgetPlanPublished) {
        if publication.lineage != [selection.decision_id.clone()] {
            return Err(broken(format!(
                "publication {} is not derived from selection {}",
                publication.decision_id, selection.decision_id
            )));
        }
    }
    Ok(())
}

/// Same decisions, same order, parent mapping preserved under audit ids
pub fn check_audit_parity(records: &[TraceRecord], audit_path: &Path, run: &str) -> VerificationResult<()> {
    let mismatch = |reason: String| VerificationError::AuditMismatch {
        run: run.to_string(),
        reason,
    };

    if !audit_path.is_file() {
        return Err(mismatch(format!("audit database {} is missing", audit_path.display())));
    }
    let rows = read_audit_records(audit_path).map_err(|e| mismatch(e.to_string()))?;

    if rows.len() != records.len() {
        return Err(mismatch(format!(
            "{} audit rows vs {} trace events",
            rows.len(),
            records.len()
        )));
    }

    for (record, row) in records.iter().zip(&rows) {
        if row.decision_id != record.decision_id {
            return Err(mismatch(format!(
                "expected decision {} but audit row holds {}",
                record.decision_id, row.decision_id
            )));
        }
        if row.audit_id != audit_id_for(&record.decision_id) {
            return Err(mismatch(format!("audit id for {} is not derived from it", record.decision_id)));
        }
        let expected_parent = record.lineage.first().map(|p| audit_id_for(p));
        if row.parent_audit_id != expected_parent {
            return Err(mismatch(format!("parent mapping lost for {}", record.decision_id)));
        }
        if row.decision_type != record.decision_type.as_str() {
            return Err(mismatch(format!("decision type differs for {}", record.decision_id)));
        }
    }
    Ok(())
}

fn selected_plan_name(records: &[TraceRecord]) -> String {
    records
        .iter()
        .find(|r| r.decision_type == DecisionType::FinalPlanSelected)
        .and_then(|r| r.outcome.get("selected_plan_name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn top_driver_categories(records: &[TraceRecord]) -> Vec<String> {
    records
        .iter()
        .find(|r| r.decision_type == DecisionType::TopDriversIdentified)
        .and_then(|r| r.outcome.get("top_drivers"))
        .and_then(Value::as_array)
        .map(|drivers| {
            drivers
                .iter()
                .filter_map(|d| d.get("category").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// BATCH CHECKS
// ============================================================================

/// Fails only when every run picked the same plan name and the same drivers.
/// A single run cannot vary, so batches of one always pass.
pub fn check_cross_run_variation(runs: &[RunVerification]) -> VerificationResult<()> {
    if runs.len() < 2 {
        return Ok(());
    }

    let names: BTreeSet<&str> = runs.iter().map(|r| r.selected_plan_name.as_str()).collect();
    let driver_sets: BTreeSet<&[String]> = runs.iter().map(|r| r.top_drivers.as_slice()).collect();

    if names.len() == 1 && driver_sets.len() == 1 {
        return Err(VerificationError::NoCrossRunVariation { runs: runs.len() });
    }
    Ok(())
}

/// Verify every named run under `runs_dir`, then the batch as a whole
pub fn verify_batch(runs_dir: &Path, runs: &[String]) -> VerificationResult<Vec<RunVerification>> {
    let mut verified = Vec::with_capacity(runs.len());
    for run in runs {
        match verify_run(&runs_dir.join(run), run) {
            Ok(v) => verified.push(v),
            Err(e) => {
                warn!(run = %run, error = %e, "verification failed");
                return Err(e);
            }
        }
    }

    check_cross_run_variation(&verified)?;
    info!(runs = verified.len(), "batch verified");
    Ok(verified)
}
