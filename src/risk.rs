// 🎯 Risk Evaluation - feasibility and concentration checks per plan
//
// 1. single-category cut ceiling      (FAIL when exceeded)
// 2. savings overconcentration        (WARN when exceeded)
// 3. behavioral realism, mean cut     (WARN above 25%)

use crate::constraints::Constraints;
use crate::plans::Plan;
use crate::spend::{round2, round_to, CategoryTotals};
use crate::verdict::{Check, RiskCheckStatus, RiskVerdict};

/// Mean cut fraction above which a plan is considered a stretch
pub const BEHAVIORAL_MEAN_CUT_LIMIT: f64 = 0.25;

/// Render a fraction as a percentage with two decimals (0.5833 → "58.33%")
fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

pub fn evaluate_risk(plan: &Plan, totals: &CategoryTotals, constraints: &Constraints) -> RiskVerdict {
    let (concentration, largest_share) = check_overconcentration(plan, totals, constraints);

    RiskVerdict::from_checks(
        vec![
            check_single_category_cut(plan, constraints),
            concentration,
            check_behavioral_realism(plan),
        ],
        round_to(largest_share, 4),
    )
}

fn check_single_category_cut(plan: &Plan, constraints: &Constraints) -> Check<RiskCheckStatus> {
    let limit = constraints.single_category_cut_limit_pct;
    // cuts is ordered, so the list is already sorted
    let over_limit: Vec<&str> = plan
        .cuts
        .iter()
        .filter(|(_, fraction)| **fraction > limit)
        .map(|(category, _)| category.as_str())
        .collect();

    if over_limit.is_empty() {
        Check::new(
            "SINGLE_CATEGORY_CUT_LIMIT_RESPECTED",
            RiskCheckStatus::Pass,
            "No category exceeds the single-category cut limit.",
        )
    } else {
        Check::new(
            "SINGLE_CATEGORY_CUT_LIMIT_EXCEEDED",
            RiskCheckStatus::Fail,
            format!("Categories over cut limit: {}.", over_limit.join(", ")),
        )
    }
}

/// Returns the check plus the unrounded largest savings share
fn check_overconcentration(
    plan: &Plan,
    totals: &CategoryTotals,
    constraints: &Constraints,
) -> (Check<RiskCheckStatus>, f64) {
    let category_savings: Vec<f64> = plan
        .cuts
        .iter()
        .map(|(category, fraction)| round2(totals.get(category).copied().unwrap_or(0.0) * fraction))
        .collect();
    let total_savings: f64 = category_savings.iter().sum();

    let largest_share = if total_savings > 0.0 {
        category_savings
            .iter()
            .map(|savings| savings / total_savings)
            .fold(0.0, f64::max)
    } else {
        0.0
    };

    let limit = constraints.overconcentration_limit_pct;
    let concentrated = largest_share > limit;
    let explain = format!(
        "Largest category contributes {} of savings vs limit {}.",
        pct(largest_share),
        pct(limit)
    );

    let check = if concentrated {
        Check::new("OVERCONCENTRATION_LIMIT_EXCEEDED", RiskCheckStatus::Warn, explain)
    } else {
        Check::new("OVERCONCENTRATION_LIMIT_OK", RiskCheckStatus::Pass, explain)
    };

    (check, largest_share)
}

fn check_behavioral_realism(plan: &Plan) -> Check<RiskCheckStatus> {
    let mean_cut = if plan.cuts.is_empty() {
        0.0
    } else {
        plan.cuts.values().sum::<f64>() / plan.cuts.len() as f64
    };

    let explain = format!(
        "Average category cut is {}; higher cuts are harder to sustain.",
        pct(mean_cut)
    );

    if mean_cut > BEHAVIORAL_MEAN_CUT_LIMIT {
        Check::new("BEHAVIORAL_REALISM_STRETCH", RiskCheckStatus::Warn, explain)
    } else {
        Check::new("BEHAVIORAL_REALISM_PLAUSIBLE", RiskCheckStatus::Pass, explain)
    }
}
