// 🚨 Trace Errors - fatal conditions while building or emitting a trace
// A run either completes every stage or aborts on the first TraceError.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    #[error("Sink '{sink}' rejected event {decision_id}: {reason}")]
    SinkRejected {
        sink: &'static str,
        decision_id: String,
        reason: String,
    },

    #[error("Run directory is already bound to another emitter: {0}")]
    RunLocked(PathBuf),

    #[error("Stage out of order: expected one of [{expected}], got {found}")]
    StageOutOfOrder { expected: String, found: String },

    #[error("Lineage references unknown decision: {0}")]
    UnknownLineage(String),

    #[error("Second root event {0}: only the first decision may have empty lineage")]
    ExtraRoot(String),
}

pub type TraceResult<T> = Result<T, TraceError>;
