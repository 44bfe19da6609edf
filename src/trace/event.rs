// 🧾 Decision Event - the atomic, immutable unit of a trace
//
// Nine required attributes:
//   decision_id, timestamp, actor, decision_type,
//   context, evidence, outcome, confidence, lineage
//
// Lineage is empty only for the first event of a run; every parent is
// emitted before its children ask for its id.

use crate::error::{TraceError, TraceResult};
use crate::spend::round2;
use crate::trace::clock::Stamp;
use crate::trace::payload::DecisionPayload;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const REQUIRED_FIELDS: [&str; 9] = [
    "decision_id",
    "timestamp",
    "actor",
    "decision_type",
    "context",
    "evidence",
    "outcome",
    "confidence",
    "lineage",
];

// ============================================================================
// ACTOR
// ============================================================================

/// Stage role that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    SpendAnalystAgent,
    OptimizationAgent,
    PolicyGuardAgent,
    RiskFeasibilityAgent,
    PlannerAgent,
}

impl Actor {
    /// Execution order of the roles
    pub const ALL: [Actor; 5] = [
        Actor::SpendAnalystAgent,
        Actor::OptimizationAgent,
        Actor::PolicyGuardAgent,
        Actor::RiskFeasibilityAgent,
        Actor::PlannerAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::SpendAnalystAgent => "SpendAnalystAgent",
            Actor::OptimizationAgent => "OptimizationAgent",
            Actor::PolicyGuardAgent => "PolicyGuardAgent",
            Actor::RiskFeasibilityAgent => "RiskFeasibilityAgent",
            Actor::PlannerAgent => "PlannerAgent",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DECISION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    BaselineSpendComputed,
    TopDriversIdentified,
    PlanProposed,
    PlanEvaluatedPolicy,
    PlanEvaluatedRisk,
    FinalPlanSelected,
    BudgetPlanPublished,
}

impl DecisionType {
    pub const ALL: [DecisionType; 7] = [
        DecisionType::BaselineSpendComputed,
        DecisionType::TopDriversIdentified,
        DecisionType::PlanProposed,
        DecisionType::PlanEvaluatedPolicy,
        DecisionType::PlanEvaluatedRisk,
        DecisionType::FinalPlanSelected,
        DecisionType::BudgetPlanPublished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::BaselineSpendComputed => "BASELINE_SPEND_COMPUTED",
            DecisionType::TopDriversIdentified => "TOP_DRIVERS_IDENTIFIED",
            DecisionType::PlanProposed => "PLAN_PROPOSED",
            DecisionType::PlanEvaluatedPolicy => "PLAN_EVALUATED_POLICY",
            DecisionType::PlanEvaluatedRisk => "PLAN_EVALUATED_RISK",
            DecisionType::FinalPlanSelected => "FINAL_PLAN_SELECTED",
            DecisionType::BudgetPlanPublished => "BUDGET_PLAN_PUBLISHED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        DecisionType::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DECISION EVENT
// ============================================================================

/// Canonical in-memory event. Sinks receive projections of it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEvent {
    pub decision_id: String,
    pub timestamp: String,
    pub actor: Actor,
    pub payload: DecisionPayload,

    /// Rounded to 2 decimals, within [0, 1]
    pub confidence: f64,

    /// Parent decision ids
    pub lineage: Vec<String>,

    /// Optional policy tag merged into the context on projection
    pub policy_id: Option<String>,
}

impl DecisionEvent {
    pub fn new(
        stamp: Stamp,
        actor: Actor,
        payload: DecisionPayload,
        confidence: f64,
        lineage: Vec<String>,
    ) -> TraceResult<Self> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(TraceError::InvalidConfidence(confidence));
        }

        Ok(DecisionEvent {
            decision_id: stamp.decision_id,
            timestamp: stamp.timestamp,
            actor,
            payload,
            confidence: round2(confidence),
            lineage,
            policy_id: None,
        })
    }

    /// Attach a policy tag (first tag wins)
    pub fn with_policy_tag(mut self, policy_id: Option<&str>) -> Self {
        if self.policy_id.is_none() {
            self.policy_id = policy_id.map(str::to_string);
        }
        self
    }

    pub fn decision_type(&self) -> DecisionType {
        self.payload.decision_type()
    }

    pub fn parent(&self) -> Option<&str> {
        self.lineage.first().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.lineage.is_empty()
    }
}

// ============================================================================
// TRACE RECORD (persisted shape)
// ============================================================================

/// Flat record written to `decision_trace.jsonl`.
///
/// Fields are declared alphabetically so the serialized keys come out sorted;
/// nested maps are `serde_json::Map` (BTreeMap-backed) and sort themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub actor: Actor,
    pub confidence: f64,
    pub context: Map<String, Value>,
    pub decision_id: String,
    pub decision_type: DecisionType,
    pub evidence: Map<String, Value>,
    pub lineage: Vec<String>,
    pub outcome: Map<String, Value>,
    pub timestamp: String,
}

impl TraceRecord {
    /// One JSONL line (no trailing newline)
    pub fn to_line(&self) -> TraceResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> TraceResult<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Degraded one-line view: `timestamp | actor | decision_type | outcome`
    pub fn plain_line(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.timestamp,
            self.actor,
            self.decision_type,
            Value::Object(self.outcome.clone())
        )
    }
}
