// 🏁 Selector - deterministic ranking over evaluated plans
//
// Candidates: policy-ACCEPT plans, or every plan when none is accepted.
// Order: risk severity asc → projected savings desc → plan_id asc.

use crate::plans::Plan;
use crate::verdict::{PolicyStatus, PolicyVerdict, RiskStatus, RiskVerdict};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

/// Tie-breakers in the order they are applied
pub const TIE_BREAKERS: [&str; 4] = [
    "policy_acceptance",
    "risk_preference_ok_over_warn",
    "projected_savings_desc",
    "lexicographic_plan_id",
];

// ============================================================================
// EVALUATED PLAN
// ============================================================================

/// Decision ids of the events that introduced and judged a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanLineage {
    pub proposal_decision_id: String,
    pub policy_decision_id: String,
    pub risk_decision_id: String,
}

/// A plan after both evaluation stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedPlan {
    pub plan: Plan,
    pub policy: PolicyVerdict,
    pub risk: RiskVerdict,
    pub lineage: PlanLineage,
}

// ============================================================================
// SELECTION
// ============================================================================

/// One row of the ranked comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub plan_id: String,
    pub plan_name: String,
    pub policy: PolicyStatus,
    pub risk: RiskStatus,
    pub projected_savings: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub selected: &'a EvaluatedPlan,

    /// Ranked candidates, winner first
    pub candidates: Vec<CandidateSummary>,

    pub tie_breakers_applied: Vec<String>,
    pub rationale: String,

    /// True when no plan passed policy and every plan was ranked
    pub fallback_used: bool,
}

fn rank(a: &EvaluatedPlan, b: &EvaluatedPlan) -> Ordering {
    a.risk
        .risk_status
        .cmp(&b.risk.risk_status)
        .then_with(|| {
            b.plan
                .projected_savings
                .partial_cmp(&a.plan.projected_savings)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.plan.plan_id.cmp(&b.plan.plan_id))
}

/// Rank plans and pick the winner. Returns None only for an empty slice.
pub fn select_plan(plans: &[EvaluatedPlan]) -> Option<Selection<'_>> {
    let mut candidates: Vec<&EvaluatedPlan> = plans.iter().filter(|p| p.policy.is_accepted()).collect();

    let fallback_used = candidates.is_empty();
    if fallback_used {
        warn!(
            plan_count = plans.len(),
            "no plan passed policy; ranking every plan"
        );
        candidates = plans.iter().collect();
    }

    candidates.sort_by(|a, b| rank(a, b));
    let selected = *candidates.first()?;

    let summaries = candidates
        .iter()
        .map(|p| CandidateSummary {
            plan_id: p.plan.plan_id.clone(),
            plan_name: p.plan.plan_name.clone(),
            policy: p.policy.policy_status,
            risk: p.risk.risk_status,
            projected_savings: p.plan.projected_savings,
        })
        .collect();

    let rationale = format!(
        "{} won because it satisfied policy and had the best risk-adjusted savings among candidates. \
         Tie-breakers resolved any remaining ordering deterministically.",
        selected.plan.plan_name
    );

    Some(Selection {
        selected,
        candidates: summaries,
        tie_breakers_applied: TIE_BREAKERS.iter().map(|t| t.to_string()).collect(),
        rationale,
        fallback_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::{Check, PolicyCheckStatus, RiskCheckStatus};
    use std::collections::BTreeMap;

    fn evaluated(plan_id: &str, savings: f64, accepted: bool, risk: RiskCheckStatus) -> EvaluatedPlan {
        EvaluatedPlan {
            plan: Plan {
                plan_id: plan_id.to_string(),
                plan_name: format!("Name for {}", plan_id),
                plan_summary: String::new(),
                cuts: BTreeMap::new(),
                projected_savings: savings,
                savings_transfer_amount: 0.0,
                category_changes: 0,
            },
            policy: PolicyVerdict::from_checks(vec![Check::new(
                "POLICY",
                PolicyCheckStatus::from_passed(accepted),
                "test",
            )]),
            risk: RiskVerdict::from_checks(vec![Check::new("RISK", risk, "test")], 0.0),
            lineage: PlanLineage {
                proposal_decision_id: format!("{}-proposal", plan_id),
                policy_decision_id: format!("{}-policy", plan_id),
                risk_decision_id: format!("{}-risk", plan_id),
            },
        }
    }

    #[test]
    fn test_rejected_plans_are_not_candidates() {
        let plans = vec![
            evaluated("a_plan", 500.0, false, RiskCheckStatus::Pass),
            evaluated("b_plan", 100.0, true, RiskCheckStatus::Pass),
        ];

        let selection = select_plan(&plans).unwrap();
        assert_eq!(selection.selected.plan.plan_id, "b_plan");
        assert_eq!(selection.candidates.len(), 1);
        assert!(!selection.fallback_used);
    }

    #[test]
    fn test_risk_beats_savings() {
        let plans = vec![
            evaluated("rich_warn", 500.0, true, RiskCheckStatus::Warn),
            evaluated("modest_ok", 100.0, true, RiskCheckStatus::Pass),
        ];

        let selection = select_plan(&plans).unwrap();
        assert_eq!(selection.selected.plan.plan_id, "modest_ok");
        assert_eq!(selection.candidates[1].risk, RiskStatus::Warn);
    }

    #[test]
    fn test_savings_then_plan_id_break_ties() {
        let plans = vec![
            evaluated("zeta", 200.0, true, RiskCheckStatus::Pass),
            evaluated("alpha", 200.0, true, RiskCheckStatus::Pass),
            evaluated("beta", 300.0, true, RiskCheckStatus::Pass),
        ];

        let selection = select_plan(&plans).unwrap();
        let order: Vec<&str> = selection.candidates.iter().map(|c| c.plan_id.as_str()).collect();
        assert_eq!(order, vec!["beta", "alpha", "zeta"]);
    }

    #[test]
    fn test_all_rejected_falls_back_to_every_plan() {
        let plans = vec![
            evaluated("one", 10.0, false, RiskCheckStatus::Fail),
            evaluated("two", 20.0, false, RiskCheckStatus::Warn),
            evaluated("three", 30.0, false, RiskCheckStatus::Warn),
        ];

        let selection = select_plan(&plans).unwrap();

        assert!(selection.fallback_used);
        assert_eq!(selection.selected.plan.plan_id, "three");
        assert_eq!(selection.candidates.len(), 3);
        assert!(selection.candidates.iter().all(|c| c.policy == PolicyStatus::Reject));
        assert_eq!(selection.candidates[2].risk, RiskStatus::Reject);
        assert_eq!(selection.tie_breakers_applied.len(), TIE_BREAKERS.len());
        assert!(selection.rationale.starts_with("Name for three won"));
    }

    #[test]
    fn test_empty_input() {
        assert!(select_plan(&[]).is_none());
    }
}
