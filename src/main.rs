use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use tracing_subscriber::EnvFilter;

use budget_trace::{run_all, run_persona, verify_batch, PipelineConfig, RunSummary};

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let config = PipelineConfig::default();

    match args.get(1).map(String::as_str) {
        Some("demo") => {
            let Some(persona) = args.get(2) else {
                bail!("Usage: budget-trace demo <persona>");
            };
            cmd_demo(&config, persona)
        }
        Some("demo-all") => cmd_demo_all(&config),
        Some("verify") => cmd_verify(&config),
        Some("clean") => cmd_clean(&config),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

/// RUST_LOG overrides the default `info` filter
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn print_usage() {
    println!("budget-trace {}", budget_trace::VERSION);
    println!();
    println!("Usage:");
    println!("  budget-trace demo <persona>   Run one persona ({})", budget_trace::CANONICAL_PERSONAS.join(", "));
    println!("  budget-trace demo-all         Run every persona");
    println!("  budget-trace verify           Verify every persona's run");
    println!("  budget-trace clean            Remove all run outputs");
}

fn print_summary(summary: &RunSummary) {
    println!("✓ {} → {}", summary.persona, summary.selected_plan_name);
    println!("   Baseline spend: ${:.2}", summary.baseline.baseline_spend);
    println!("   Target reduction: ${:.2}", summary.baseline.target_reduction_amount);
    println!("   Decisions emitted: {}", summary.records.len());
    if summary.fallback_used {
        println!("   ⚠️  No plan passed policy; selected from all plans");
    }
    println!("   Output: {}", summary.run_dir.display());
}

fn cmd_demo(config: &PipelineConfig, persona: &str) -> Result<()> {
    println!("🧾 Budget Trace - persona run");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let summary = run_persona(config, persona)?;
    print_summary(&summary);
    Ok(())
}

fn cmd_demo_all(config: &PipelineConfig) -> Result<()> {
    println!("🧾 Budget Trace - all personas");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for summary in run_all(config)? {
        print_summary(&summary);
    }
    Ok(())
}

fn cmd_verify(config: &PipelineConfig) -> Result<()> {
    println!("🔍 Verifying runs in {}", config.runs_dir().display());

    let verified = verify_batch(&config.runs_dir(), &config.personas)?;
    for run in &verified {
        println!("✓ {} ({} decisions)", run.run, run.events);
    }
    println!("✅ Verification passed");
    Ok(())
}

fn cmd_clean(config: &PipelineConfig) -> Result<()> {
    let runs_dir = config.runs_dir();
    if runs_dir.exists() {
        fs::remove_dir_all(&runs_dir).with_context(|| format!("Failed to remove {}", runs_dir.display()))?;
        println!("🧹 Removed {}", runs_dir.display());
    } else {
        println!("Nothing to clean at {}", runs_dir.display());
    }
    Ok(())
}
