// 🧩 Plan Construction - three fixed templates over ranked cut categories
//
// Templates are constants, never learned:
//   focused_trim_and_savings_shift  {p1: 0.35, p1b: 0.25}
//   targeted_lifestyle_rebalance    {p2: 0.25, p2b: 0.20}
//   broad_based_efficiency_plan     {p1: 0.20, p2: 0.20, p1b: 0.15}

use crate::constraints::Constraints;
use crate::spend::{round2, CategoryTotals, Driver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many cut categories the templates draw on
pub const CUT_CATEGORY_COUNT: usize = 4;

/// Never chosen as a cut category, even when it ranks highly
pub const ALWAYS_PROTECTED_CATEGORY: &str = "Groceries";

/// Categories the backfill step never picks
pub const BACKFILL_EXCLUDED: [&str; 6] = [
    "Income",
    "Groceries",
    "Rent",
    "Utilities",
    "Healthcare",
    "Savings",
];

/// Used when no cut category could be selected at all
pub const DEFAULT_CUT_CATEGORY: &str = "Dining";

// ============================================================================
// PLAN
// ============================================================================

/// A candidate budget plan. Built once per run, then read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Stable slug, unique within a run
    pub plan_id: String,
    pub plan_name: String,
    pub plan_summary: String,

    /// Category → cut fraction
    pub cuts: BTreeMap<String, f64>,

    pub projected_savings: f64,
    pub savings_transfer_amount: f64,
    pub category_changes: usize,
}

impl Plan {
    fn draft(plan_id: &str, plan_name: String, plan_summary: String, cuts: &[(&str, f64)]) -> Self {
        let mut cut_map = BTreeMap::new();
        for (category, fraction) in cuts {
            // a repeated category keeps the later fraction
            cut_map.insert(category.to_string(), *fraction);
        }

        Plan {
            plan_id: plan_id.to_string(),
            plan_name,
            plan_summary,
            category_changes: cut_map.len(),
            cuts: cut_map,
            projected_savings: 0.0,
            savings_transfer_amount: 0.0,
        }
    }

    fn price(&mut self, totals: &CategoryTotals, transfer_pct: f64) {
        let projected: f64 = self
            .cuts
            .iter()
            .map(|(category, fraction)| totals.get(category).copied().unwrap_or(0.0) * fraction)
            .sum();

        self.projected_savings = round2(projected);
        self.savings_transfer_amount = round2(projected * transfer_pct);
    }

    /// Cut fraction for a category (0.0 when untouched)
    pub fn cut_for(&self, category: &str) -> f64 {
        self.cuts.get(category).copied().unwrap_or(0.0)
    }
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

/// Pick up to four cut categories from the ranking, then backfill with the
/// lexicographically smallest remaining eligible categories.
pub fn choose_cut_categories(totals: &CategoryTotals, drivers: &[Driver]) -> Vec<String> {
    let mut selected: Vec<String> = drivers
        .iter()
        .filter(|d| d.category != ALWAYS_PROTECTED_CATEGORY)
        .take(CUT_CATEGORY_COUNT)
        .map(|d| d.category.clone())
        .collect();

    while selected.len() < CUT_CATEGORY_COUNT {
        // totals is a BTreeMap, so keys arrive sorted
        let fallback = totals.keys().find(|category| {
            !selected.contains(category) && !BACKFILL_EXCLUDED.contains(&category.as_str())
        });

        match fallback {
            Some(category) => selected.push(category.clone()),
            None => break,
        }
    }

    selected
}

/// Build the three template plans, priced against the category totals
pub fn build_plans(
    totals: &CategoryTotals,
    drivers: &[Driver],
    constraints: &Constraints,
) -> Vec<Plan> {
    let selected = choose_cut_categories(totals, drivers);

    let p1 = selected
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_CUT_CATEGORY);
    let p1b = selected.get(1).map(String::as_str).unwrap_or(p1);
    let p2 = selected.get(2).map(String::as_str).unwrap_or(p1b);
    let p2b = selected.get(3).map(String::as_str).unwrap_or(p2);

    let mut plans = vec![
        Plan::draft(
            "focused_trim_and_savings_shift",
            format!("Reduce {} and {} with aggressive savings transfer", p1, p1b),
            format!(
                "Cut {} deeply, trim {}, and route most savings into reserves.",
                p1, p1b
            ),
            &[(p1, 0.35), (p1b, 0.25)],
        ),
        Plan::draft(
            "targeted_lifestyle_rebalance",
            format!("Rebalance {} and {} with moderate cutbacks", p2, p2b),
            format!(
                "Spread moderate reductions across {} and {} to protect consistency.",
                p2, p2b
            ),
            &[(p2, 0.25), (p2b, 0.20)],
        ),
        Plan::draft(
            "broad_based_efficiency_plan",
            format!("Broad efficiency plan across {}, {}, and {}", p1, p2, p1b),
            "Use lighter reductions across three discretionary categories for behavioral feasibility."
                .to_string(),
            &[(p1, 0.20), (p2, 0.20), (p1b, 0.15)],
        ),
    ];

    for plan in &mut plans {
        plan.price(totals, constraints.savings_transfer.percentage);
    }

    plans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::tests::sample_constraints;
    use crate::spend::{category_totals, discretionary_drivers};
    use crate::transactions::Transaction;

    fn totals_of(pairs: &[(&str, f64)]) -> CategoryTotals {
        let transactions: Vec<Transaction> = pairs
            .iter()
            .map(|(category, amount)| Transaction::new("2025-01-01", category, "Merchant", *amount))
            .collect();
        category_totals(&transactions)
    }

    #[test]
    fn test_three_plans_with_stable_ids() {
        let constraints = sample_constraints();
        let totals = totals_of(&[
            ("Dining", 400.0),
            ("Entertainment", 300.0),
            ("Shopping", 200.0),
            ("Transport", 100.0),
            ("Groceries", 500.0),
        ]);
        let drivers = discretionary_drivers(&totals, &constraints);
        let plans = build_plans(&totals, &drivers, &constraints);

        let ids: Vec<&str> = plans.iter().map(|p| p.plan_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "focused_trim_and_savings_shift",
                "targeted_lifestyle_rebalance",
                "broad_based_efficiency_plan"
            ]
        );

        // 400 × 0.35 + 300 × 0.25
        assert_eq!(plans[0].projected_savings, 215.0);
        assert_eq!(plans[0].savings_transfer_amount, 107.5);
        assert_eq!(plans[0].category_changes, 2);

        assert_eq!(plans[1].cut_for("Shopping"), 0.25);
        assert_eq!(plans[1].cut_for("Transport"), 0.20);

        assert_eq!(plans[2].category_changes, 3);
        assert_eq!(plans[2].plan_name, "Broad efficiency plan across Dining, Shopping, and Entertainment");
    }

    #[test]
    fn test_groceries_never_selected() {
        let constraints = sample_constraints();
        let totals = totals_of(&[("Dining", 120.0), ("Transport", 80.0), ("Groceries", 300.0)]);
        let drivers = discretionary_drivers(&totals, &constraints);
        let plans = build_plans(&totals, &drivers, &constraints);

        for plan in &plans {
            assert!(!plan.cuts.contains_key("Groceries"), "{} cuts Groceries", plan.plan_id);
            assert!(!plan.cuts.contains_key("Rent"), "{} cuts Rent", plan.plan_id);
        }
    }

    #[test]
    fn test_short_ranking_collapses_duplicates() {
        let constraints = sample_constraints();
        let totals = totals_of(&[("Dining", 120.0), ("Transport", 80.0), ("Groceries", 300.0)]);
        let drivers = discretionary_drivers(&totals, &constraints);
        let plans = build_plans(&totals, &drivers, &constraints);

        // p2 and p2b both fall back to Transport; the later 0.20 wins
        assert_eq!(plans[1].cuts.len(), 1);
        assert_eq!(plans[1].cut_for("Transport"), 0.20);
        assert_eq!(plans[1].category_changes, 1);

        // broad plan: Dining 0.20, Transport 0.20 then 0.15
        assert_eq!(plans[2].cut_for("Transport"), 0.15);
        assert_eq!(plans[2].projected_savings, 36.0);
    }

    #[test]
    fn test_backfill_uses_sorted_eligible_categories() {
        let mut constraints = sample_constraints();
        constraints.protected_categories.insert("Travel".to_string());
        let totals = totals_of(&[
            ("Dining", 50.0),
            ("Travel", 900.0),
            ("Utilities", 100.0),
            ("Apparel", 10.0),
        ]);
        let drivers = discretionary_drivers(&totals, &constraints);

        // Utilities, Dining, Apparel rank; protection filters the ranking, not the backfill
        let selected = choose_cut_categories(&totals, &drivers);
        assert_eq!(selected, vec!["Utilities", "Dining", "Apparel", "Travel"]);
    }

    #[test]
    fn test_empty_totals_fall_back_to_default_category() {
        let constraints = sample_constraints();
        let totals = CategoryTotals::new();
        let plans = build_plans(&totals, &[], &constraints);

        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|p| p.cuts.keys().all(|c| c == DEFAULT_CUT_CATEGORY)));
        assert!(plans.iter().all(|p| p.projected_savings == 0.0));
    }

    #[test]
    fn test_savings_round_half_to_even() {
        let constraints = sample_constraints();
        let totals = totals_of(&[("Dining", 96.5)]);
        let drivers = discretionary_drivers(&totals, &constraints);
        let plans = build_plans(&totals, &drivers, &constraints);

        // single category: both template slots collapse to Dining 0.25
        assert_eq!(plans[0].cut_for("Dining"), 0.25);
        // 96.5 × 0.25 = 24.125 exactly
        assert_eq!(plans[0].projected_savings, 24.12);
        assert_eq!(plans[0].savings_transfer_amount, 12.06);
    }

    #[test]
    fn test_construction_is_deterministic() {
        let constraints = sample_constraints();
        let totals = totals_of(&[("Dining", 220.0), ("Streaming", 60.0), ("Games", 60.0)]);
        let drivers = discretionary_drivers(&totals, &constraints);

        let first = build_plans(&totals, &drivers, &constraints);
        let second = build_plans(&totals, &drivers, &constraints);
        assert_eq!(first, second);
    }
}
