// 🛡️ Policy Evaluation - four independent PASS/FAIL checks per plan
//
// 1. PROTECTED_CATEGORIES_UNCHANGED
// 2. GROCERY_MINIMUM_MET
// 3. MAX_CATEGORY_CHANGES_WITHIN_LIMIT
// 4. SAVINGS_TRANSFER_RULE_APPLIED

use crate::constraints::Constraints;
use crate::plans::Plan;
use crate::spend::{round2, CategoryTotals};
use crate::verdict::{Check, PolicyCheckStatus, PolicyVerdict};

pub const PROTECTED_CATEGORIES_UNCHANGED: &str = "PROTECTED_CATEGORIES_UNCHANGED";
pub const GROCERY_MINIMUM_MET: &str = "GROCERY_MINIMUM_MET";
pub const MAX_CATEGORY_CHANGES_WITHIN_LIMIT: &str = "MAX_CATEGORY_CHANGES_WITHIN_LIMIT";
pub const SAVINGS_TRANSFER_RULE_APPLIED: &str = "SAVINGS_TRANSFER_RULE_APPLIED";

const GROCERIES: &str = "Groceries";

/// Run every policy check against one plan
pub fn evaluate_policy(plan: &Plan, totals: &CategoryTotals, constraints: &Constraints) -> PolicyVerdict {
    PolicyVerdict::from_checks(vec![
        check_protected_categories(plan, constraints),
        check_grocery_minimum(plan, totals, constraints),
        check_max_category_changes(plan, constraints),
        check_savings_transfer(plan, constraints),
    ])
}

fn check_protected_categories(plan: &Plan, constraints: &Constraints) -> Check<PolicyCheckStatus> {
    let protected_changed = plan.cuts.keys().any(|c| constraints.is_protected(c));

    Check::new(
        PROTECTED_CATEGORIES_UNCHANGED,
        PolicyCheckStatus::from_passed(!protected_changed),
        if protected_changed {
            "Plan attempts to cut a protected category."
        } else {
            "Protected categories remain unchanged."
        },
    )
}

fn check_grocery_minimum(
    plan: &Plan,
    totals: &CategoryTotals,
    constraints: &Constraints,
) -> Check<PolicyCheckStatus> {
    let groceries_total = totals.get(GROCERIES).copied().unwrap_or(0.0);
    let groceries_after = groceries_total * (1.0 - plan.cut_for(GROCERIES));

    Check::new(
        GROCERY_MINIMUM_MET,
        PolicyCheckStatus::from_passed(groceries_after >= constraints.min_groceries),
        format!(
            "Projected groceries {:.2} must be at least {:.2}.",
            groceries_after, constraints.min_groceries
        ),
    )
}

fn check_max_category_changes(plan: &Plan, constraints: &Constraints) -> Check<PolicyCheckStatus> {
    Check::new(
        MAX_CATEGORY_CHANGES_WITHIN_LIMIT,
        PolicyCheckStatus::from_passed(plan.category_changes <= constraints.max_category_changes),
        format!(
            "Plan changes {} categories; limit is {}.",
            plan.category_changes, constraints.max_category_changes
        ),
    )
}

fn check_savings_transfer(plan: &Plan, constraints: &Constraints) -> Check<PolicyCheckStatus> {
    let transfer = &constraints.savings_transfer;
    let expected_transfer = round2(plan.projected_savings * transfer.percentage);
    let transfer_ok = !transfer.enabled || plan.savings_transfer_amount >= expected_transfer;

    Check::new(
        SAVINGS_TRANSFER_RULE_APPLIED,
        PolicyCheckStatus::from_passed(transfer_ok),
        format!(
            "Savings transfer is {:.2} and required minimum is {:.2}.",
            plan.savings_transfer_amount, expected_transfer
        ),
    )
}
