// 📦 Decision Payloads - typed context/evidence/outcome per decision type
//
// The persisted trace keeps these as free-form JSON objects; in memory each
// decision type has its own strongly typed shape.

use crate::error::{TraceError, TraceResult};
use crate::selector::CandidateSummary;
use crate::spend::{CategoryTotals, Driver};
use crate::trace::event::DecisionType;
use crate::verdict::{Check, PolicyCheckStatus, PolicyStatus, RiskCheckStatus, RiskStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Computed,
    Identified,
    Proposed,
    Selected,
    Published,
}

/// The three maps every decision carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage<C, E, O> {
    pub context: C,
    pub evidence: E,
    pub outcome: O,
}

// ============================================================================
// CONTEXTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaContext {
    pub persona: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineContext {
    pub persona: String,
    pub input_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalContext {
    pub persona: String,
    pub target_reduction_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanContext {
    pub persona: String,
    pub plan_id: String,
    pub plan_name: String,
}

// ============================================================================
// EVIDENCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEvidence {
    pub category_totals: CategoryTotals,
    pub target_reduction_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriversEvidence {
    pub protected_categories: Vec<String>,
    pub discretionary_candidates: Vec<Driver>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalEvidence {
    pub plan_id: String,
    pub plan_name: String,
    pub plan_summary: String,
    pub cuts: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvidence {
    pub reason_codes: Vec<Check<PolicyCheckStatus>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvidence {
    pub reason_codes: Vec<Check<RiskCheckStatus>>,
    pub largest_savings_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEvidence {
    pub candidate_comparison_summary: Vec<CandidateSummary>,
    pub tie_breakers_applied: Vec<String>,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationEvidence {
    pub selected_plan_id: String,
    pub selected_plan_name: String,
    pub markdown_sections: Vec<String>,
}

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineOutcome {
    pub baseline_spend: f64,
    pub target_reduction_amount: f64,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriversOutcome {
    pub top_drivers: Vec<Driver>,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalOutcome {
    pub projected_savings: f64,
    pub savings_transfer_amount: f64,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub policy_status: PolicyStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskOutcome {
    pub risk_status: RiskStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub selected_plan_id: String,
    pub selected_plan_name: String,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationOutcome {
    pub status: StageStatus,
    pub artifact: String,
}

// ============================================================================
// PAYLOAD UNION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionPayload {
    BaselineSpendComputed(Stage<BaselineContext, BaselineEvidence, BaselineOutcome>),
    TopDriversIdentified(Stage<PersonaContext, DriversEvidence, DriversOutcome>),
    PlanProposed(Stage<ProposalContext, ProposalEvidence, ProposalOutcome>),
    PlanEvaluatedPolicy(Stage<PlanContext, PolicyEvidence, PolicyOutcome>),
    PlanEvaluatedRisk(Stage<PlanContext, RiskEvidence, RiskOutcome>),
    FinalPlanSelected(Stage<PersonaContext, SelectionEvidence, SelectionOutcome>),
    BudgetPlanPublished(Stage<PersonaContext, PublicationEvidence, PublicationOutcome>),
}

/// context, evidence, outcome as JSON objects
pub type PayloadMaps = (Map<String, Value>, Map<String, Value>, Map<String, Value>);

fn to_object<T: Serialize>(value: &T, field: &str) -> TraceResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(TraceError::MissingField(format!("{} must be an object", field))),
    }
}

fn stage_maps<C: Serialize, E: Serialize, O: Serialize>(stage: &Stage<C, E, O>) -> TraceResult<PayloadMaps> {
    Ok((
        to_object(&stage.context, "context")?,
        to_object(&stage.evidence, "evidence")?,
        to_object(&stage.outcome, "outcome")?,
    ))
}

fn stage_from<C: DeserializeOwned, E: DeserializeOwned, O: DeserializeOwned>(
    context: &Map<String, Value>,
    evidence: &Map<String, Value>,
    outcome: &Map<String, Value>,
) -> TraceResult<Stage<C, E, O>> {
    Ok(Stage {
        context: serde_json::from_value(Value::Object(context.clone()))?,
        evidence: serde_json::from_value(Value::Object(evidence.clone()))?,
        outcome: serde_json::from_value(Value::Object(outcome.clone()))?,
    })
}

impl DecisionPayload {
    pub fn decision_type(&self) -> DecisionType {
        match self {
            DecisionPayload::BaselineSpendComputed(_) => DecisionType::BaselineSpendComputed,
            DecisionPayload::TopDriversIdentified(_) => DecisionType::TopDriversIdentified,
            DecisionPayload::PlanProposed(_) => DecisionType::PlanProposed,
            DecisionPayload::PlanEvaluatedPolicy(_) => DecisionType::PlanEvaluatedPolicy,
            DecisionPayload::PlanEvaluatedRisk(_) => DecisionType::PlanEvaluatedRisk,
            DecisionPayload::FinalPlanSelected(_) => DecisionType::FinalPlanSelected,
            DecisionPayload::BudgetPlanPublished(_) => DecisionType::BudgetPlanPublished,
        }
    }

    /// Flatten into the three free-form maps of the persisted record
    pub fn to_maps(&self) -> TraceResult<PayloadMaps> {
        match self {
            DecisionPayload::BaselineSpendComputed(stage) => stage_maps(stage),
            DecisionPayload::TopDriversIdentified(stage) => stage_maps(stage),
            DecisionPayload::PlanProposed(stage) => stage_maps(stage),
            DecisionPayload::PlanEvaluatedPolicy(stage) => stage_maps(stage),
            DecisionPayload::PlanEvaluatedRisk(stage) => stage_maps(stage),
            DecisionPayload::FinalPlanSelected(stage) => stage_maps(stage),
            DecisionPayload::BudgetPlanPublished(stage) => stage_maps(stage),
        }
    }

    /// Rebuild the typed payload from persisted maps.
    /// Extra keys (such as a policy tag) are ignored.
    pub fn from_maps(
        decision_type: DecisionType,
        context: &Map<String, Value>,
        evidence: &Map<String, Value>,
        outcome: &Map<String, Value>,
    ) -> TraceResult<Self> {
        Ok(match decision_type {
            DecisionType::BaselineSpendComputed => {
                DecisionPayload::BaselineSpendComputed(stage_from(context, evidence, outcome)?)
            }
            DecisionType::TopDriversIdentified => {
                DecisionPayload::TopDriversIdentified(stage_from(context, evidence, outcome)?)
            }
            DecisionType::PlanProposed => DecisionPayload::PlanProposed(stage_from(context, evidence, outcome)?),
            DecisionType::PlanEvaluatedPolicy => {
                DecisionPayload::PlanEvaluatedPolicy(stage_from(context, evidence, outcome)?)
            }
            DecisionType::PlanEvaluatedRisk => {
                DecisionPayload::PlanEvaluatedRisk(stage_from(context, evidence, outcome)?)
            }
            DecisionType::FinalPlanSelected => {
                DecisionPayload::FinalPlanSelected(stage_from(context, evidence, outcome)?)
            }
            DecisionType::BudgetPlanPublished => {
                DecisionPayload::BudgetPlanPublished(stage_from(context, evidence, outcome)?)
            }
        })
    }
}
