// Decision trace subsystem
// Event model, lineage graph, projections and the dual-sink emitter

pub mod audit;
pub mod clock;
pub mod emitter;
pub mod event;
pub mod graph;
pub mod payload;
pub mod projection;

/// Structured sink (one JSON object per line)
pub const TRACE_FILE: &str = "decision_trace.jsonl";

/// Audit sink (SQLite)
pub const AUDIT_FILE: &str = "audit_trace.db";

/// Held while an emitter is bound to a run directory
pub const LOCK_FILE: &str = ".trace.lock";

pub use audit::{read_audit_records, AuditSink};
pub use clock::{Stamp, TraceClock};
pub use emitter::{JsonlSink, RunLock, TraceEmitter, TraceSink};
pub use event::{Actor, DecisionEvent, DecisionType, TraceRecord, REQUIRED_FIELDS};
pub use graph::{DecisionGraph, GraphError};
pub use payload::{DecisionPayload, Stage, StageStatus};
pub use projection::{audit_id_for, audit_record, structured_record, AuditRecord};
