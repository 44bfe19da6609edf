// 📏 Constraints - read-only rule bundle for one run
// Loaded once from constraints.yaml, validated, then shared by every stage.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

// ============================================================================
// CONSTRAINTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTransfer {
    /// Whether the transfer rule is enforced by policy
    pub enabled: bool,

    /// Fraction of projected savings routed to savings (0.0 - 1.0)
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Target reduction as a fraction of baseline spend
    pub target_reduction_pct: f64,

    /// Categories no plan may cut
    pub protected_categories: BTreeSet<String>,

    /// Minimum projected groceries spend after cuts
    pub min_groceries: f64,

    /// Maximum number of categories one plan may change
    pub max_category_changes: usize,

    /// Ceiling on any single category's cut fraction
    pub single_category_cut_limit_pct: f64,

    /// Ceiling on the largest category's share of total savings
    pub overconcentration_limit_pct: f64,

    pub savings_transfer: SavingsTransfer,
}

impl Constraints {
    /// Load and validate constraints from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read constraints file: {}", path.display()))?;

        let constraints: Constraints = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse constraints file: {}", path.display()))?;

        constraints
            .validate()
            .with_context(|| format!("Invalid constraints in {}", path.display()))?;

        Ok(constraints)
    }

    /// Reject values that would make the evaluators meaningless
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("target_reduction_pct", self.target_reduction_pct),
            (
                "single_category_cut_limit_pct",
                self.single_category_cut_limit_pct,
            ),
            (
                "overconcentration_limit_pct",
                self.overconcentration_limit_pct,
            ),
            ("savings_transfer.percentage", self.savings_transfer.percentage),
        ];

        for (field, value) in fractions {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                bail!("{} must be a fraction in [0, 1], got {}", field, value);
            }
        }

        if !self.min_groceries.is_finite() || self.min_groceries < 0.0 {
            bail!("min_groceries must be non-negative, got {}", self.min_groceries);
        }

        Ok(())
    }

    pub fn is_protected(&self, category: &str) -> bool {
        self.protected_categories.contains(category)
    }
}
