// 🚦 Stage Tracker - the per-run state machine
//
// START → BASELINE → DRIVERS → PROPOSED ×n → POLICY ×n → RISK ×n
//       → SELECTED → PUBLISHED → END
//
// Any other order is a fatal StageOutOfOrder.

use crate::error::{TraceError, TraceResult};
use crate::trace::{Actor, DecisionType};

/// Plans proposed per run
pub const PLANS_PER_RUN: usize = 3;

/// Fixed per-stage certainty
pub fn confidence_for(decision_type: DecisionType) -> f64 {
    match decision_type {
        DecisionType::BaselineSpendComputed => 0.99,
        DecisionType::TopDriversIdentified => 0.97,
        DecisionType::PlanProposed => 0.94,
        DecisionType::PlanEvaluatedPolicy => 0.96,
        DecisionType::PlanEvaluatedRisk => 0.93,
        DecisionType::FinalPlanSelected => 0.95,
        DecisionType::BudgetPlanPublished => 0.99,
    }
}

/// Role that owns each decision type
pub fn actor_for(decision_type: DecisionType) -> Actor {
    match decision_type {
        DecisionType::BaselineSpendComputed | DecisionType::TopDriversIdentified => Actor::SpendAnalystAgent,
        DecisionType::PlanProposed => Actor::OptimizationAgent,
        DecisionType::PlanEvaluatedPolicy => Actor::PolicyGuardAgent,
        DecisionType::PlanEvaluatedRisk => Actor::RiskFeasibilityAgent,
        DecisionType::FinalPlanSelected | DecisionType::BudgetPlanPublished => Actor::PlannerAgent,
    }
}

/// Full emission order for a run with `plan_count` plans
pub fn expected_sequence(plan_count: usize) -> Vec<DecisionType> {
    let mut sequence = vec![DecisionType::BaselineSpendComputed, DecisionType::TopDriversIdentified];
    for repeated in [
        DecisionType::PlanProposed,
        DecisionType::PlanEvaluatedPolicy,
        DecisionType::PlanEvaluatedRisk,
    ] {
        sequence.extend(std::iter::repeat(repeated).take(plan_count));
    }
    sequence.push(DecisionType::FinalPlanSelected);
    sequence.push(DecisionType::BudgetPlanPublished);
    sequence
}

#[derive(Debug, Clone)]
pub struct StageTracker {
    sequence: Vec<DecisionType>,
    position: usize,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new(PLANS_PER_RUN)
    }
}

impl StageTracker {
    pub fn new(plan_count: usize) -> Self {
        Self {
            sequence: expected_sequence(plan_count),
            position: 0,
        }
    }

    pub fn expected(&self) -> Option<DecisionType> {
        self.sequence.get(self.position).copied()
    }

    /// Accept the next decision type or fail the run
    pub fn advance(&mut self, decision_type: DecisionType) -> TraceResult<()> {
        match self.expected() {
            Some(expected) if expected == decision_type => {
                self.position += 1;
                Ok(())
            }
            expected => Err(TraceError::StageOutOfOrder {
                expected: expected.map(|t| t.as_str()).unwrap_or("END").to_string(),
                found: decision_type.as_str().to_string(),
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.position == self.sequence.len()
    }

    /// Fail unless every stage has been emitted
    pub fn finish(&self) -> TraceResult<()> {
        match self.expected() {
            None => Ok(()),
            Some(expected) => Err(TraceError::StageOutOfOrder {
                expected: expected.as_str().to_string(),
                found: "END".to_string(),
            }),
        }
    }
}
