// 📊 Spend Aggregation - baseline spend and discretionary ranking
//
// baseline_spend   = Σ category totals (Income excluded)
// target_reduction = baseline_spend × target_reduction_pct
//
// The discretionary ranking order (amount desc, category asc) is a contract:
// plan construction depends on it.

use crate::constraints::Constraints;
use crate::transactions::{Transaction, INCOME_CATEGORY};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Category label → summed non-income amount
pub type CategoryTotals = BTreeMap<String, f64>;

/// Number of ranked drivers reported as "top drivers"
pub const TOP_DRIVER_COUNT: usize = 3;

/// Round the exact binary value to `places` decimals, ties to even.
/// Non-finite values pass through unchanged.
pub fn round_to(value: f64, places: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

// ============================================================================
// DRIVER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub category: String,
    pub amount: f64,
}

// ============================================================================
// SPEND BASELINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendBaseline {
    pub category_totals: CategoryTotals,
    pub baseline_spend: f64,
    pub target_reduction_pct: f64,
    pub target_reduction_amount: f64,
}

impl SpendBaseline {
    /// Aggregate transactions and derive the reduction target
    pub fn compute(transactions: &[Transaction], constraints: &Constraints) -> Self {
        let category_totals = category_totals(transactions);
        let baseline_spend = round2(category_totals.values().sum());
        let target_reduction_amount = round2(baseline_spend * constraints.target_reduction_pct);

        SpendBaseline {
            category_totals,
            baseline_spend,
            target_reduction_pct: constraints.target_reduction_pct,
            target_reduction_amount,
        }
    }

    /// Totals rounded to cents, as reported in evidence
    pub fn rounded_totals(&self) -> CategoryTotals {
        self.category_totals
            .iter()
            .map(|(category, total)| (category.clone(), round2(*total)))
            .collect()
    }

    pub fn total_for(&self, category: &str) -> f64 {
        self.category_totals.get(category).copied().unwrap_or(0.0)
    }
}

/// Sum amounts per category, skipping income
pub fn category_totals(transactions: &[Transaction]) -> CategoryTotals {
    let mut totals = CategoryTotals::new();
    for tx in transactions.iter().filter(|tx| !tx.is_income()) {
        *totals.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
    }
    totals
}

/// Rank discretionary categories: amount descending, then category ascending.
/// Protected categories and income never appear.
pub fn discretionary_drivers(totals: &CategoryTotals, constraints: &Constraints) -> Vec<Driver> {
    let mut drivers: Vec<Driver> = totals
        .iter()
        .filter(|(category, _)| {
            category.as_str() != INCOME_CATEGORY && !constraints.is_protected(category)
        })
        .map(|(category, amount)| Driver {
            category: category.clone(),
            amount: *amount,
        })
        .collect();

    drivers.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    drivers
}

/// First ranked drivers, amounts rounded to cents
pub fn top_drivers(drivers: &[Driver]) -> Vec<Driver> {
    drivers
        .iter()
        .take(TOP_DRIVER_COUNT)
        .map(|d| Driver {
            category: d.category.clone(),
            amount: round2(d.amount),
        })
        .collect()
}
