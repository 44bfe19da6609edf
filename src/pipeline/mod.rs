// 🔁 Pipeline Orchestrator - one persona, one pass, thirteen decisions
//
// 1. crew kickoff (no decision content)
// 2. baseline → drivers → proposals → policy → risk → selection → publication
// 3. reports written from the emitted records
//
// Lineage is threaded explicitly: every stage receives its parent's id.

pub mod report;
pub mod stage;

use crate::config::{PipelineConfig, RunLayout};
use crate::constraints::Constraints;
use crate::crew::SequentialCrew;
use crate::error::TraceResult;
use crate::plans::{build_plans, Plan};
use crate::policy::evaluate_policy;
use crate::risk::evaluate_risk;
use crate::selector::{select_plan, EvaluatedPlan, PlanLineage};
use crate::spend::{discretionary_drivers, top_drivers, Driver, SpendBaseline};
use crate::trace::payload::*;
use crate::trace::{DecisionEvent, TraceEmitter, TraceRecord};
use crate::transactions::{load_transactions, Transaction};
use crate::verdict::{PolicyVerdict, RiskVerdict};
use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use tracing::info;

use report::{render_budget_plan, write_reports, Scorecard, MARKDOWN_SECTIONS};
use stage::{actor_for, confidence_for, StageTracker};

// ============================================================================
// RUN CONTEXT
// ============================================================================

/// Explicit per-run state: the bound emitter, the policy tag and the stage order
pub struct RunContext {
    emitter: TraceEmitter,
    tracker: StageTracker,
    policy_id: Option<String>,
}

impl RunContext {
    pub fn new(emitter: TraceEmitter, policy_id: Option<String>) -> Self {
        Self {
            emitter,
            tracker: StageTracker::default(),
            policy_id,
        }
    }

    /// Build the event, attach the policy tag, hand it to the emitter
    pub fn record(&mut self, payload: DecisionPayload, lineage: Vec<String>) -> TraceResult<TraceRecord> {
        let decision_type = payload.decision_type();
        self.tracker.advance(decision_type)?;

        let event = DecisionEvent::new(
            self.emitter.stamp(),
            actor_for(decision_type),
            payload,
            confidence_for(decision_type),
            lineage,
        )?
        .with_policy_tag(self.policy_id.as_deref());

        self.emitter.emit(&event)
    }

    /// Require a complete stage sequence, then close both sinks
    pub fn finish(self) -> TraceResult<Vec<TraceRecord>> {
        self.tracker.finish()?;
        self.emitter.close()
    }
}

// ============================================================================
// RUN
// ============================================================================

/// Everything one run needs, already loaded
#[derive(Debug, Clone)]
pub struct RunInputs<'a> {
    pub persona: &'a str,
    pub transactions: &'a [Transaction],
    pub constraints: &'a Constraints,

    /// Reported in the baseline context
    pub input_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub persona: String,
    pub run_dir: PathBuf,
    pub baseline: SpendBaseline,
    pub top_drivers: Vec<Driver>,
    pub plans: Vec<EvaluatedPlan>,
    pub selected_plan_id: String,
    pub selected_plan_name: String,

    /// No plan passed policy; every plan was ranked
    pub fallback_used: bool,

    pub records: Vec<TraceRecord>,
}

fn lineage_of(parent: &TraceRecord) -> Vec<String> {
    vec![parent.decision_id.clone()]
}

/// Execute the full stage sequence for one persona into `layout`
pub fn execute(inputs: RunInputs<'_>, layout: &RunLayout, policy_id: Option<&str>) -> Result<RunSummary> {
    let emitter = TraceEmitter::open(layout.run_dir())
        .with_context(|| format!("Failed to bind trace emitter to {}", layout.run_dir().display()))?;
    execute_with(inputs, layout, policy_id, emitter)
}

/// Execute the stage sequence against an already bound emitter
pub(crate) fn execute_with(
    inputs: RunInputs<'_>,
    layout: &RunLayout,
    policy_id: Option<&str>,
    emitter: TraceEmitter,
) -> Result<RunSummary> {
    let persona = inputs.persona;
    let constraints = inputs.constraints;

    let crew = SequentialCrew::for_persona(persona);
    crew.kickoff();

    let mut ctx = RunContext::new(emitter, policy_id.map(str::to_string));

    info!(persona, run_dir = %layout.run_dir().display(), "run started");

    // ------------------------------------------------------------------
    // Spend analysis
    // ------------------------------------------------------------------
    let baseline = SpendBaseline::compute(inputs.transactions, constraints);
    let drivers = discretionary_drivers(&baseline.category_totals, constraints);
    let top = top_drivers(&drivers);

    let baseline_record = ctx.record(
        DecisionPayload::BaselineSpendComputed(Stage {
            context: BaselineContext {
                persona: persona.to_string(),
                input_files: inputs.input_files.clone(),
            },
            evidence: BaselineEvidence {
                category_totals: baseline.rounded_totals(),
                target_reduction_pct: baseline.target_reduction_pct,
            },
            outcome: BaselineOutcome {
                baseline_spend: baseline.baseline_spend,
                target_reduction_amount: baseline.target_reduction_amount,
                status: StageStatus::Computed,
            },
        }),
        vec![],
    )?;

    let drivers_record = ctx.record(
        DecisionPayload::TopDriversIdentified(Stage {
            context: PersonaContext {
                persona: persona.to_string(),
            },
            evidence: DriversEvidence {
                // BTreeSet iterates sorted
                protected_categories: constraints.protected_categories.iter().cloned().collect(),
                discretionary_candidates: top.clone(),
            },
            outcome: DriversOutcome {
                top_drivers: top.clone(),
                status: StageStatus::Identified,
            },
        }),
        lineage_of(&baseline_record),
    )?;

    // ------------------------------------------------------------------
    // Proposals, then policy, then risk, always in plan order
    // ------------------------------------------------------------------
    let plans = build_plans(&baseline.category_totals, &drivers, constraints);

    let mut proposals: Vec<(Plan, String)> = Vec::with_capacity(plans.len());
    for plan in plans {
        let record = ctx.record(
            DecisionPayload::PlanProposed(Stage {
                context: ProposalContext {
                    persona: persona.to_string(),
                    target_reduction_amount: baseline.target_reduction_amount,
                },
                evidence: ProposalEvidence {
                    plan_id: plan.plan_id.clone(),
                    plan_name: plan.plan_name.clone(),
                    plan_summary: plan.plan_summary.clone(),
                    cuts: plan.cuts.clone(),
                },
                outcome: ProposalOutcome {
                    projected_savings: plan.projected_savings,
                    savings_transfer_amount: plan.savings_transfer_amount,
                    status: StageStatus::Proposed,
                },
            }),
            lineage_of(&drivers_record),
        )?;
        proposals.push((plan, record.decision_id));
    }

    let mut policy_checked: Vec<(Plan, String, PolicyVerdict, String)> = Vec::with_capacity(proposals.len());
    for (plan, proposal_id) in proposals {
        let verdict = evaluate_policy(&plan, &baseline.category_totals, constraints);
        let record = ctx.record(
            DecisionPayload::PlanEvaluatedPolicy(Stage {
                context: plan_context(persona, &plan),
                evidence: PolicyEvidence {
                    reason_codes: verdict.checks.clone(),
                },
                outcome: PolicyOutcome {
                    policy_status: verdict.policy_status,
                },
            }),
            vec![proposal_id.clone()],
        )?;
        policy_checked.push((plan, proposal_id, verdict, record.decision_id));
    }

    let mut evaluated: Vec<EvaluatedPlan> = Vec::with_capacity(policy_checked.len());
    for (plan, proposal_id, policy, policy_decision_id) in policy_checked {
        let risk: RiskVerdict = evaluate_risk(&plan, &baseline.category_totals, constraints);
        let record = ctx.record(
            DecisionPayload::PlanEvaluatedRisk(Stage {
                context: plan_context(persona, &plan),
                evidence: RiskEvidence {
                    reason_codes: risk.checks.clone(),
                    largest_savings_share: risk.largest_savings_share,
                },
                outcome: RiskOutcome {
                    risk_status: risk.risk_status,
                },
            }),
            vec![policy_decision_id.clone()],
        )?;
        evaluated.push(EvaluatedPlan {
            plan,
            policy,
            risk,
            lineage: PlanLineage {
                proposal_decision_id: proposal_id,
                policy_decision_id,
                risk_decision_id: record.decision_id,
            },
        });
    }

    // ------------------------------------------------------------------
    // Selection and publication
    // ------------------------------------------------------------------
    let selection = select_plan(&evaluated).ok_or_else(|| anyhow!("No plans were built for {}", persona))?;
    let selected = selection.selected;

    let selection_record = ctx.record(
        DecisionPayload::FinalPlanSelected(Stage {
            context: PersonaContext {
                persona: persona.to_string(),
            },
            evidence: SelectionEvidence {
                candidate_comparison_summary: selection.candidates.clone(),
                tie_breakers_applied: selection.tie_breakers_applied.clone(),
                rationale: selection.rationale.clone(),
            },
            outcome: SelectionOutcome {
                selected_plan_id: selected.plan.plan_id.clone(),
                selected_plan_name: selected.plan.plan_name.clone(),
                status: StageStatus::Selected,
            },
        }),
        vec![selected.lineage.risk_decision_id.clone()],
    )?;

    let budget_markdown = render_budget_plan(persona, selected, &selection.rationale);

    ctx.record(
        DecisionPayload::BudgetPlanPublished(Stage {
            context: PersonaContext {
                persona: persona.to_string(),
            },
            evidence: PublicationEvidence {
                selected_plan_id: selected.plan.plan_id.clone(),
                selected_plan_name: selected.plan.plan_name.clone(),
                markdown_sections: MARKDOWN_SECTIONS.iter().map(|s| s.to_string()).collect(),
            },
            outcome: PublicationOutcome {
                status: StageStatus::Published,
                artifact: layout.budget_plan_path().display().to_string(),
            },
        }),
        lineage_of(&selection_record),
    )?;

    let records = ctx.finish()?;

    let scorecard = Scorecard::build(persona, &baseline, &top, &evaluated, selected);
    write_reports(layout, &budget_markdown, &scorecard, &records)?;

    info!(
        persona,
        selected_plan = %selected.plan.plan_id,
        fallback = selection.fallback_used,
        events = records.len(),
        "run finished"
    );

    Ok(RunSummary {
        persona: persona.to_string(),
        run_dir: layout.run_dir().to_path_buf(),
        selected_plan_id: selected.plan.plan_id.clone(),
        selected_plan_name: selected.plan.plan_name.clone(),
        fallback_used: selection.fallback_used,
        baseline,
        top_drivers: top,
        plans: evaluated.clone(),
        records,
    })
}

fn plan_context(persona: &str, plan: &Plan) -> PlanContext {
    PlanContext {
        persona: persona.to_string(),
        plan_id: plan.plan_id.clone(),
        plan_name: plan.plan_name.clone(),
    }
}

/// Input paths as reported in the trace, relative to the working directory
fn reported_input_files(config: &PipelineConfig, persona: &str) -> Vec<String> {
    vec![
        config.transactions_path(persona).display().to_string(),
        config.constraints_path().display().to_string(),
    ]
}

/// Load one persona's inputs and run it into `<out_dir>/runs/<persona>/`
pub fn run_persona(config: &PipelineConfig, persona: &str) -> Result<RunSummary> {
    if !config.is_known_persona(persona) {
        bail!("Unsupported persona: {}", persona);
    }
    config.validate_inputs()?;

    let transactions = load_transactions(&config.transactions_path(persona))?;
    let constraints = Constraints::from_file(config.constraints_path())?;

    execute(
        RunInputs {
            persona,
            transactions: &transactions,
            constraints: &constraints,
            input_files: reported_input_files(config, persona),
        },
        &config.run_layout(persona),
        config.policy_id.as_deref(),
    )
    .with_context(|| format!("Run aborted for persona {}", persona))
}

/// Run every configured persona in order, stopping at the first failure
pub fn run_all(config: &PipelineConfig) -> Result<Vec<RunSummary>> {
    config.validate_inputs()?;
    config.personas.iter().map(|persona| run_persona(config, persona)).collect()
}
