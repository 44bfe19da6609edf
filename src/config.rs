// ⚙️ Pipeline Configuration - input/output layout and run options
//
// Defaults come from the environment:
//   BUDGET_TRACE_DATA_DIR   (default "data")
//   BUDGET_TRACE_OUT_DIR    (default "out")
//   BUDGET_TRACE_POLICY_ID  (unset = no policy tag)

use crate::trace::{AUDIT_FILE, LOCK_FILE, TRACE_FILE};
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const CANONICAL_PERSONAS: [&str; 3] = ["movie_buff", "sports_fan", "foodie"];

pub const PLAIN_LOG_FILE: &str = "plain_trace.log";
pub const SCORECARD_FILE: &str = "scorecard.json";
pub const BUDGET_PLAN_FILE: &str = "budget_plan.md";

/// Text artifacts every finished run must contain
pub const TEXT_ARTIFACTS: [&str; 4] = [TRACE_FILE, PLAIN_LOG_FILE, SCORECARD_FILE, BUDGET_PLAN_FILE];

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub personas: Vec<String>,

    /// Tag merged into every event's context when set
    pub policy_id: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::var("BUDGET_TRACE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            out_dir: std::env::var("BUDGET_TRACE_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("out")),
            personas: CANONICAL_PERSONAS.iter().map(|p| p.to_string()).collect(),
            policy_id: std::env::var("BUDGET_TRACE_POLICY_ID")
                .ok()
                .filter(|p| !p.trim().is_empty()),
        }
    }
}

impl PipelineConfig {
    /// Explicit directories, canonical personas, no policy tag
    pub fn with_dirs(data_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            out_dir: out_dir.into(),
            personas: CANONICAL_PERSONAS.iter().map(|p| p.to_string()).collect(),
            policy_id: None,
        }
    }

    pub fn with_policy_id(mut self, policy_id: &str) -> Self {
        self.policy_id = Some(policy_id.to_string());
        self
    }

    pub fn is_known_persona(&self, persona: &str) -> bool {
        self.personas.iter().any(|p| p == persona)
    }

    pub fn transactions_path(&self, persona: &str) -> PathBuf {
        self.data_dir.join("personas").join(persona).join("transactions.csv")
    }

    pub fn constraints_path(&self) -> PathBuf {
        self.data_dir.join("constraints.yaml")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.out_dir.join("runs")
    }

    pub fn run_layout(&self, persona: &str) -> RunLayout {
        RunLayout::new(self.runs_dir().join(persona))
    }

    /// Every input file a full batch needs
    pub fn canonical_inputs(&self) -> Vec<PathBuf> {
        let mut inputs: Vec<PathBuf> = self.personas.iter().map(|p| self.transactions_path(p)).collect();
        inputs.push(self.constraints_path());
        inputs
    }

    /// Fail before any stage runs, naming every missing input
    pub fn validate_inputs(&self) -> Result<()> {
        let missing: Vec<String> = self
            .canonical_inputs()
            .into_iter()
            .filter(|path| !path.exists())
            .map(|path| path.display().to_string())
            .collect();

        if !missing.is_empty() {
            bail!("Missing canonical inputs: [{}]", missing.join(", "));
        }
        Ok(())
    }
}

// ============================================================================
// RUN LAYOUT
// ============================================================================

/// Artifact paths inside one run directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub run_dir: PathBuf,
}

impl RunLayout {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self { run_dir: run_dir.into() }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn trace_path(&self) -> PathBuf {
        self.run_dir.join(TRACE_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.run_dir.join(AUDIT_FILE)
    }

    pub fn plain_log_path(&self) -> PathBuf {
        self.run_dir.join(PLAIN_LOG_FILE)
    }

    pub fn scorecard_path(&self) -> PathBuf {
        self.run_dir.join(SCORECARD_FILE)
    }

    pub fn budget_plan_path(&self) -> PathBuf {
        self.run_dir.join(BUDGET_PLAN_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.run_dir.join(LOCK_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let config = PipelineConfig::with_dirs("data", "out");

        assert_eq!(
            config.transactions_path("foodie"),
            PathBuf::from("data/personas/foodie/transactions.csv")
        );
        assert_eq!(config.constraints_path(), PathBuf::from("data/constraints.yaml"));

        let layout = config.run_layout("foodie");
        assert_eq!(layout.trace_path(), PathBuf::from("out/runs/foodie/decision_trace.jsonl"));
        assert_eq!(layout.audit_path(), PathBuf::from("out/runs/foodie/audit_trace.db"));
        assert_eq!(layout.lock_path(), PathBuf::from("out/runs/foodie/.trace.lock"));
    }

    #[test]
    fn test_missing_inputs_are_all_named() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::with_dirs(dir.path(), dir.path().join("out"));
        fs::write(config.constraints_path(), "target_reduction_pct: 0.1\n").unwrap();

        let err = config.validate_inputs().unwrap_err().to_string();
        for persona in CANONICAL_PERSONAS {
            assert!(err.contains(persona), "missing persona {} in: {}", persona, err);
        }
        assert!(!err.contains("constraints.yaml"));
    }

    #[test]
    fn test_personas_and_policy_tag() {
        let config = PipelineConfig::with_dirs("data", "out").with_policy_id("budget-policy-v1");

        assert!(config.is_known_persona("movie_buff"));
        assert!(!config.is_known_persona("gamer"));
        assert_eq!(config.policy_id.as_deref(), Some("budget-policy-v1"));
        assert_eq!(config.canonical_inputs().len(), 4);
    }
}
