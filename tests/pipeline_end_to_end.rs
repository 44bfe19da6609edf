// End-to-end runs over real files: load → run → verify

use budget_trace::trace::{read_audit_records, RunLock};
use budget_trace::{
    run_all, run_persona, verify_batch, verify_run, DecisionType, PipelineConfig, TraceError, TraceRecord,
    VerificationError,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONSTRAINTS: &str = "\
target_reduction_pct: 0.10
protected_categories:
  - Groceries
  - Rent
min_groceries: 250
max_category_changes: 3
single_category_cut_limit_pct: 0.40
overconcentration_limit_pct: 0.60
savings_transfer:
  enabled: true
  percentage: 0.50
";

fn persona_csv(persona: &str) -> &'static str {
    match persona {
        "movie_buff" => {
            "date,category,merchant,amount\n\
             2025-01-01,Income,Studio,4200.00\n\
             2025-01-02,Rent,Landlord,1400.00\n\
             2025-01-04,Cinema,Grand Odeon,180.00\n\
             2025-01-06,Streaming,FlixNet,95.00\n\
             2025-01-09,Groceries,Corner Market,420.00\n\
             2025-01-12,Dining,Noodle Bar,60.00\n"
        }
        "sports_fan" => {
            "date,category,merchant,amount\n\
             2025-01-01,Income,Club Payroll,3900.00\n\
             2025-01-02,Rent,Landlord,1300.00\n\
             2025-01-05,Sports,Stadium Tickets,260.00\n\
             2025-01-07,Bars,Sports Pub,140.00\n\
             2025-01-10,Groceries,Corner Market,380.00\n\
             2025-01-14,Transport,Metro,45.00\n"
        }
        _ => {
            "date,category,merchant,amount\n\
             2025-01-01,Income,Kitchen Co,4500.00\n\
             2025-01-02,Rent,Landlord,1500.00\n\
             2025-01-03,Dining,Le Petit Bistro,310.00\n\
             2025-01-06,Bars,Wine Cellar,120.00\n\
             2025-01-08,Coffee,Blue Bottle,55.00\n\
             2025-01-11,Groceries,Farmers Market,460.00\n"
        }
    }
}

/// data/ with every canonical persona plus the shared constraints
fn write_data(root: &Path, constraints: &str) {
    let data = root.join("data");
    for persona in budget_trace::CANONICAL_PERSONAS {
        let dir = data.join("personas").join(persona);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("transactions.csv"), persona_csv(persona)).unwrap();
    }
    fs::write(data.join("constraints.yaml"), constraints).unwrap();
}

fn setup(constraints: &str) -> (TempDir, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    write_data(dir.path(), constraints);
    let config = PipelineConfig::with_dirs(dir.path().join("data"), dir.path().join("out"));
    (dir, config)
}

fn read_trace(config: &PipelineConfig, persona: &str) -> Vec<TraceRecord> {
    let content = fs::read_to_string(config.run_layout(persona).trace_path()).unwrap();
    content.lines().map(|line| TraceRecord::from_line(line).unwrap()).collect()
}

#[test]
fn test_all_personas_run_and_verify() {
    let (_dir, config) = setup(CONSTRAINTS);

    let summaries = run_all(&config).unwrap();
    assert_eq!(summaries.len(), 3);

    let verified = verify_batch(&config.runs_dir(), &config.personas).unwrap();
    assert_eq!(verified.len(), 3);
    assert!(verified.iter().all(|v| v.events == 13));
}

#[test]
fn test_trace_shape_on_disk() {
    let (_dir, config) = setup(CONSTRAINTS);
    run_persona(&config, "movie_buff").unwrap();

    let records = read_trace(&config, "movie_buff");
    assert_eq!(records.len(), 13);

    let count = |t: DecisionType| records.iter().filter(|r| r.decision_type == t).count();
    assert_eq!(count(DecisionType::BaselineSpendComputed), 1);
    assert_eq!(count(DecisionType::TopDriversIdentified), 1);
    assert_eq!(count(DecisionType::PlanProposed), 3);
    assert_eq!(count(DecisionType::PlanEvaluatedPolicy), 3);
    assert_eq!(count(DecisionType::PlanEvaluatedRisk), 3);
    assert_eq!(count(DecisionType::FinalPlanSelected), 1);
    assert_eq!(count(DecisionType::BudgetPlanPublished), 1);

    // one root, every parent already seen, timestamps never go backwards
    assert!(records[0].lineage.is_empty());
    for (i, record) in records.iter().enumerate().skip(1) {
        assert_eq!(record.lineage.len(), 1);
        let parent = &record.lineage[0];
        assert!(records[..i].iter().any(|r| &r.decision_id == parent));
        assert!(records[i - 1].timestamp <= record.timestamp);
    }

    // keys are written sorted
    let first_line = fs::read_to_string(config.run_layout("movie_buff").trace_path()).unwrap();
    let first_line = first_line.lines().next().unwrap().to_string();
    let keys = [
        "\"actor\"",
        "\"confidence\"",
        "\"context\"",
        "\"decision_id\"",
        "\"decision_type\"",
        "\"evidence\"",
        "\"lineage\"",
        "\"outcome\"",
        "\"timestamp\"",
    ];
    let positions: Vec<usize> = keys.iter().map(|k| first_line.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_audit_sink_mirrors_trace() {
    let (_dir, config) = setup(CONSTRAINTS);
    run_persona(&config, "foodie").unwrap();

    let layout = config.run_layout("foodie");
    let records = read_trace(&config, "foodie");
    let audit = read_audit_records(&layout.audit_path()).unwrap();

    assert_eq!(audit.len(), records.len());
    for (row, record) in audit.iter().zip(&records) {
        assert_eq!(row.decision_id, record.decision_id);
        assert_eq!(row.decision_type, record.decision_type.as_str());
        assert!(row.audit_id.starts_with("aud_"));
    }
    assert!(audit[0].parent_audit_id.is_none());
    assert_eq!(audit[1].parent_audit_id.as_deref(), Some(audit[0].audit_id.as_str()));
}

#[test]
fn test_protected_categories_never_cut() {
    let (_dir, config) = setup(CONSTRAINTS);

    for summary in run_all(&config).unwrap() {
        for plan in &summary.plans {
            assert!(!plan.plan.cuts.contains_key("Groceries"));
            assert!(!plan.plan.cuts.contains_key("Rent"));
        }
    }
}

#[test]
fn test_personas_differ() {
    let (_dir, config) = setup(CONSTRAINTS);
    let summaries = run_all(&config).unwrap();

    let leaders: Vec<&str> = summaries.iter().map(|s| s.top_drivers[0].category.as_str()).collect();
    assert_eq!(leaders, vec!["Cinema", "Sports", "Dining"]);
}

#[test]
fn test_identical_personas_fail_cross_run_variation() {
    let (dir, config) = setup(CONSTRAINTS);

    // every persona gets the same spending
    let data = dir.path().join("data").join("personas");
    for persona in budget_trace::CANONICAL_PERSONAS {
        fs::write(data.join(persona).join("transactions.csv"), persona_csv("foodie")).unwrap();
    }

    run_all(&config).unwrap();
    let err = verify_batch(&config.runs_dir(), &config.personas).unwrap_err();
    assert_eq!(err, VerificationError::NoCrossRunVariation { runs: 3 });
}

#[test]
fn test_rerun_is_deterministic() {
    let (_dir, config) = setup(CONSTRAINTS);

    let first = run_persona(&config, "sports_fan").unwrap();
    let layout = config.run_layout("sports_fan");
    let scorecard = fs::read_to_string(layout.scorecard_path()).unwrap();
    let markdown = fs::read_to_string(layout.budget_plan_path()).unwrap();

    let second = run_persona(&config, "sports_fan").unwrap();
    assert_eq!(first.selected_plan_id, second.selected_plan_id);
    assert_eq!(first.plans.len(), second.plans.len());
    for (a, b) in first.plans.iter().zip(&second.plans) {
        assert_eq!(a.plan, b.plan);
        assert_eq!(a.policy, b.policy);
        assert_eq!(a.risk, b.risk);
    }
    assert_eq!(fs::read_to_string(layout.scorecard_path()).unwrap(), scorecard);
    assert_eq!(fs::read_to_string(layout.budget_plan_path()).unwrap(), markdown);

    // the second run replaced the first trace rather than appending
    assert_eq!(read_trace(&config, "sports_fan").len(), 13);
    assert_ne!(first.records[0].decision_id, second.records[0].decision_id);
}

#[test]
fn test_all_plans_rejected_falls_back() {
    let strict = CONSTRAINTS.replace("max_category_changes: 3", "max_category_changes: 0");
    let (_dir, config) = setup(&strict);

    let summary = run_persona(&config, "movie_buff").unwrap();
    assert!(summary.fallback_used);
    assert!(summary.plans.iter().all(|p| !p.policy.is_accepted()));

    let records = read_trace(&config, "movie_buff");
    let selection = records
        .iter()
        .find(|r| r.decision_type == DecisionType::FinalPlanSelected)
        .unwrap();
    let candidates = selection.evidence["candidate_comparison_summary"].as_array().unwrap();
    assert_eq!(candidates.len(), 3);
    assert!(candidates.iter().all(|c| c["policy"] == "REJECT"));

    // still a well-formed trace
    verify_run(config.run_layout("movie_buff").run_dir(), "movie_buff").unwrap();
}

#[test]
fn test_policy_tag_from_config() {
    let (_dir, config) = setup(CONSTRAINTS);
    let config = config.with_policy_id("household-2025");

    run_persona(&config, "foodie").unwrap();
    let records = read_trace(&config, "foodie");
    assert!(records.iter().all(|r| r.context["policy_id"] == "household-2025"));
}

#[test]
fn test_locked_run_directory_is_refused() {
    let (_dir, config) = setup(CONSTRAINTS);
    let layout = config.run_layout("foodie");
    fs::create_dir_all(layout.run_dir()).unwrap();

    let lock = RunLock::acquire(layout.run_dir()).unwrap();
    let err = run_persona(&config, "foodie").unwrap_err();
    assert!(err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<TraceError>(), Some(TraceError::RunLocked(_)))));
    assert!(!layout.trace_path().exists());

    drop(lock);
    run_persona(&config, "foodie").unwrap();
}

#[test]
fn test_missing_inputs_abort_before_output() {
    let (dir, config) = setup(CONSTRAINTS);
    fs::remove_file(dir.path().join("data").join("constraints.yaml")).unwrap();

    let err = run_all(&config).unwrap_err();
    assert!(err.to_string().contains("Missing canonical inputs"));
    assert!(!config.runs_dir().exists());
}
