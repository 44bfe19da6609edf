// Budget Trace - Core Library
// Deterministic budget pipeline with an auditable, verifiable decision trace

pub mod config;
pub mod constraints;
pub mod crew;
pub mod error;
pub mod pipeline;
pub mod plans;
pub mod policy;
pub mod risk;
pub mod selector;
pub mod spend;
pub mod trace;
pub mod transactions;
pub mod verdict;
pub mod verify;

// Re-export commonly used types
pub use config::{PipelineConfig, RunLayout, CANONICAL_PERSONAS};
pub use constraints::{Constraints, SavingsTransfer};
pub use crew::SequentialCrew;
pub use error::{TraceError, TraceResult};
pub use pipeline::{execute, run_all, run_persona, RunContext, RunInputs, RunSummary};
pub use plans::{build_plans, Plan};
pub use policy::evaluate_policy;
pub use risk::evaluate_risk;
pub use selector::{select_plan, EvaluatedPlan, Selection, TIE_BREAKERS};
pub use spend::{CategoryTotals, Driver, SpendBaseline};
pub use trace::{
    Actor, DecisionEvent, DecisionGraph, DecisionPayload, DecisionType, TraceEmitter, TraceRecord,
};
pub use transactions::{load_transactions, Transaction};
pub use verdict::{PolicyStatus, PolicyVerdict, RiskStatus, RiskVerdict};
pub use verify::{verify_batch, verify_run, RunVerification, VerificationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
