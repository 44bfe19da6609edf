// 📝 Run Reports - budget_plan.md, scorecard.json, plain_trace.log

use crate::config::RunLayout;
use crate::selector::EvaluatedPlan;
use crate::spend::{Driver, SpendBaseline};
use crate::trace::TraceRecord;
use crate::verdict::{PolicyStatus, RiskStatus};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Sections of the published markdown, in order
pub const MARKDOWN_SECTIONS: [&str; 4] = [
    "Selected Plan",
    "Category Changes",
    "Financial Impact",
    "Planner Rationale",
];

// ============================================================================
// BUDGET PLAN (markdown)
// ============================================================================

pub fn render_budget_plan(persona: &str, selected: &EvaluatedPlan, rationale: &str) -> String {
    let plan = &selected.plan;
    let mut lines = vec![
        format!("# Budget Plan for {}", persona),
        String::new(),
        format!("## {}: {}", MARKDOWN_SECTIONS[0], plan.plan_name),
        String::new(),
        plan.plan_summary.clone(),
        String::new(),
        format!("### {}", MARKDOWN_SECTIONS[1]),
    ];

    // cuts is a BTreeMap, already sorted by category
    for (category, fraction) in &plan.cuts {
        lines.push(format!("- {}: reduce by {:.0}%", category, fraction * 100.0));
    }

    lines.extend([
        String::new(),
        format!("### {}", MARKDOWN_SECTIONS[2]),
        format!("- Projected savings: ${:.2}", plan.projected_savings),
        format!("- Transfer to savings: ${:.2}", plan.savings_transfer_amount),
        String::new(),
        format!("### {}", MARKDOWN_SECTIONS[3]),
        rationale.to_string(),
    ]);

    let mut markdown = lines.join("\n");
    markdown.push('\n');
    markdown
}

// ============================================================================
// SCORECARD (json)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ScorecardPlan {
    pub plan_id: String,
    pub plan_name: String,
    pub plan_summary: String,
    pub projected_savings: f64,
    pub savings_transfer_amount: f64,
    pub policy_status: PolicyStatus,
    pub risk_status: RiskStatus,
    pub cuts: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedPlanCard {
    pub plan_id: String,
    pub plan_name: String,
    pub projected_savings: f64,
    pub risk_status: RiskStatus,
    pub policy_status: PolicyStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scorecard {
    pub persona: String,
    pub baseline_spend: f64,
    pub target_reduction_amount: f64,
    pub top_drivers: Vec<Driver>,
    pub plans: Vec<ScorecardPlan>,
    pub selected_plan: SelectedPlanCard,
}

impl Scorecard {
    pub fn build(
        persona: &str,
        baseline: &SpendBaseline,
        top_drivers: &[Driver],
        plans: &[EvaluatedPlan],
        selected: &EvaluatedPlan,
    ) -> Self {
        Scorecard {
            persona: persona.to_string(),
            baseline_spend: baseline.baseline_spend,
            target_reduction_amount: baseline.target_reduction_amount,
            top_drivers: top_drivers.to_vec(),
            plans: plans
                .iter()
                .map(|p| ScorecardPlan {
                    plan_id: p.plan.plan_id.clone(),
                    plan_name: p.plan.plan_name.clone(),
                    plan_summary: p.plan.plan_summary.clone(),
                    projected_savings: p.plan.projected_savings,
                    savings_transfer_amount: p.plan.savings_transfer_amount,
                    policy_status: p.policy.policy_status,
                    risk_status: p.risk.risk_status,
                    cuts: p.plan.cuts.clone(),
                })
                .collect(),
            selected_plan: SelectedPlanCard {
                plan_id: selected.plan.plan_id.clone(),
                plan_name: selected.plan.plan_name.clone(),
                projected_savings: selected.plan.projected_savings,
                risk_status: selected.risk.risk_status,
                policy_status: selected.policy.policy_status,
            },
        }
    }

    /// Pretty JSON with every object's keys sorted
    pub fn to_pretty_json(&self) -> Result<String> {
        // Value objects are BTreeMap-backed, so going through Value sorts keys
        let value = serde_json::to_value(self)?;
        let mut json = serde_json::to_string_pretty(&value)?;
        json.push('\n');
        Ok(json)
    }
}

// ============================================================================
// PLAIN LOG
// ============================================================================

pub fn render_plain_log(records: &[TraceRecord]) -> String {
    let mut log: String = records
        .iter()
        .map(TraceRecord::plain_line)
        .collect::<Vec<_>>()
        .join("\n");
    log.push('\n');
    log
}

fn write_artifact(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write the three text reports next to the trace
pub fn write_reports(
    layout: &RunLayout,
    budget_markdown: &str,
    scorecard: &Scorecard,
    records: &[TraceRecord],
) -> Result<()> {
    write_artifact(&layout.budget_plan_path(), budget_markdown)?;
    write_artifact(&layout.scorecard_path(), &scorecard.to_pretty_json()?)?;
    write_artifact(&layout.plain_log_path(), &render_plain_log(records))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::Plan;
    use crate::selector::PlanLineage;
    use crate::verdict::{Check, PolicyCheckStatus, PolicyVerdict, RiskCheckStatus, RiskVerdict};

    fn evaluated() -> EvaluatedPlan {
        let cuts: BTreeMap<String, f64> = [("Streaming".to_string(), 0.25), ("Cinema".to_string(), 0.2)]
            .into_iter()
            .collect();
        EvaluatedPlan {
            plan: Plan {
                plan_id: "targeted_lifestyle_rebalance".to_string(),
                plan_name: "Rebalance Streaming and Cinema with moderate cutbacks".to_string(),
                plan_summary: "Spread moderate reductions across Streaming and Cinema to protect consistency."
                    .to_string(),
                category_changes: cuts.len(),
                cuts,
                projected_savings: 61.5,
                savings_transfer_amount: 30.75,
            },
            policy: PolicyVerdict::from_checks(vec![Check::new("P", PolicyCheckStatus::Pass, "ok")]),
            risk: RiskVerdict::from_checks(vec![Check::new("R", RiskCheckStatus::Pass, "ok")], 0.5),
            lineage: PlanLineage {
                proposal_decision_id: "a".to_string(),
                policy_decision_id: "b".to_string(),
                risk_decision_id: "c".to_string(),
            },
        }
    }

    #[test]
    fn test_budget_plan_markdown() {
        let markdown = render_budget_plan("movie_buff", &evaluated(), "It won.");

        assert!(markdown.starts_with("# Budget Plan for movie_buff\n\n## Selected Plan: Rebalance"));
        // categories sorted
        let cinema = markdown.find("- Cinema: reduce by 20%").unwrap();
        let streaming = markdown.find("- Streaming: reduce by 25%").unwrap();
        assert!(cinema < streaming);
        assert!(markdown.contains("- Projected savings: $61.50"));
        assert!(markdown.contains("- Transfer to savings: $30.75"));
        assert!(markdown.ends_with("### Planner Rationale\nIt won.\n"));
    }

    #[test]
    fn test_scorecard_keys_sorted() {
        let plan = evaluated();
        let baseline = SpendBaseline {
            category_totals: BTreeMap::new(),
            baseline_spend: 500.0,
            target_reduction_pct: 0.1,
            target_reduction_amount: 50.0,
        };
        let drivers = vec![Driver {
            category: "Streaming".to_string(),
            amount: 150.0,
        }];

        let scorecard = Scorecard::build("movie_buff", &baseline, &drivers, std::slice::from_ref(&plan), &plan);
        let json = scorecard.to_pretty_json().unwrap();

        let baseline_pos = json.find("\"baseline_spend\"").unwrap();
        let persona_pos = json.find("\"persona\"").unwrap();
        let top_pos = json.find("\"top_drivers\"").unwrap();
        assert!(baseline_pos < persona_pos && persona_pos < top_pos);
        assert!(json.find("\"amount\"").unwrap() < json.find("\"category\"").unwrap());
        assert!(json.contains("\"policy_status\": \"ACCEPT\""));
        assert!(json.ends_with("}\n"));
    }
}
