// 📡 Trace Emitter - durable fan-out of each decision to both sinks
//
// Contract:
//   - both projections are built before anything is written
//   - emit() returns only after both sinks hold the event
//   - any sink failure is fatal for the run (SinkRejected)
//   - one emitter per run directory, guarded by `.trace.lock`

use crate::config::TEXT_ARTIFACTS;
use crate::error::{TraceError, TraceResult};
use crate::trace::audit::AuditSink;
use crate::trace::clock::{Stamp, TraceClock};
use crate::trace::event::{DecisionEvent, TraceRecord};
use crate::trace::projection::{audit_record, structured_record, AuditRecord};
use crate::trace::{AUDIT_FILE, LOCK_FILE, TRACE_FILE};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// SINKS
// ============================================================================

/// Durable destination for one projection of an event
pub trait TraceSink {
    fn name(&self) -> &'static str;

    /// Persist one event; must be durable on return
    fn write(&mut self, structured: &TraceRecord, audit: &AuditRecord) -> TraceResult<()>;

    fn close(&mut self) -> TraceResult<()> {
        Ok(())
    }
}

/// Sink A: append-only JSONL, flushed and synced per line
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create (or truncate) the trace file
    pub fn create(path: &Path) -> TraceResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl TraceSink for JsonlSink {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn write(&mut self, structured: &TraceRecord, _audit: &AuditRecord) -> TraceResult<()> {
        let mut line = structured.to_line()?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn close(&mut self) -> TraceResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Sink B: SQLite audit store
impl TraceSink for AuditSink {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn write(&mut self, _structured: &TraceRecord, audit: &AuditRecord) -> TraceResult<()> {
        self.insert(audit)
    }
}

// ============================================================================
// RUN LOCK
// ============================================================================

/// Exclusive claim on a run directory, released on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(run_dir: &Path) -> TraceResult<Self> {
        let path = run_dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(TraceError::RunLocked(path));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

// ============================================================================
// EMITTER
// ============================================================================

pub struct TraceEmitter {
    run_dir: PathBuf,
    clock: TraceClock,
    sinks: Vec<Box<dyn TraceSink>>,
    emitted: HashSet<String>,
    records: Vec<TraceRecord>,

    // Dropped last: sinks close before the lock is released
    _lock: RunLock,
}

/// Delete `path` if it exists
fn remove_if_present(path: &Path) -> TraceResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Remove every file a previous run left in `run_dir`: the text artifacts,
/// and the audit database together with its WAL side files
fn clear_previous_run(run_dir: &Path) -> TraceResult<()> {
    for artifact in TEXT_ARTIFACTS {
        remove_if_present(&run_dir.join(artifact))?;
    }
    let db_path = run_dir.join(AUDIT_FILE);
    for suffix in ["", "-wal", "-shm"] {
        remove_if_present(&PathBuf::from(format!("{}{}", db_path.display(), suffix)))?;
    }
    Ok(())
}

impl TraceEmitter {
    /// Bind a fresh emitter to `run_dir`, replacing any previous run there
    pub fn open(run_dir: &Path) -> TraceResult<Self> {
        Self::bind(run_dir, |dir| {
            let sinks: Vec<Box<dyn TraceSink>> = vec![
                Box::new(JsonlSink::create(&dir.join(TRACE_FILE))?),
                Box::new(AuditSink::open(&dir.join(AUDIT_FILE))?),
            ];
            Ok(sinks)
        })
    }

    /// Lock and clear `run_dir`, then attach the sinks `make_sinks` builds
    pub(crate) fn bind<F>(run_dir: &Path, make_sinks: F) -> TraceResult<Self>
    where
        F: FnOnce(&Path) -> TraceResult<Vec<Box<dyn TraceSink>>>,
    {
        fs::create_dir_all(run_dir)?;
        let lock = RunLock::acquire(run_dir)?;

        clear_previous_run(run_dir)?;
        let sinks = make_sinks(run_dir)?;

        debug!(run_dir = %run_dir.display(), sinks = sinks.len(), "trace emitter bound");

        Ok(Self {
            run_dir: run_dir.to_path_buf(),
            clock: TraceClock::new(),
            sinks,
            emitted: HashSet::new(),
            records: Vec::new(),
            _lock: lock,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Identity and time for the next event
    pub fn stamp(&mut self) -> Stamp {
        self.clock.stamp()
    }

    pub fn emitted_count(&self) -> usize {
        self.records.len()
    }

    /// Records emitted so far, in emission order
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    fn check_lineage(&self, event: &DecisionEvent) -> TraceResult<()> {
        if event.is_root() {
            if !self.records.is_empty() {
                return Err(TraceError::ExtraRoot(event.decision_id.clone()));
            }
            return Ok(());
        }

        match event.lineage.iter().find(|parent| !self.emitted.contains(*parent)) {
            Some(parent) => Err(TraceError::UnknownLineage(parent.clone())),
            None => Ok(()),
        }
    }

    /// Persist one event to every sink
    pub fn emit(&mut self, event: &DecisionEvent) -> TraceResult<TraceRecord> {
        if self.emitted.contains(&event.decision_id) {
            return Err(TraceError::SinkRejected {
                sink: "emitter",
                decision_id: event.decision_id.clone(),
                reason: "decision id already emitted".to_string(),
            });
        }
        self.check_lineage(event)?;

        let structured = structured_record(event)?;
        let audit = audit_record(event)?;

        for sink in self.sinks.iter_mut() {
            sink.write(&structured, &audit).map_err(|e| TraceError::SinkRejected {
                sink: sink.name(),
                decision_id: event.decision_id.clone(),
                reason: e.to_string(),
            })?;
        }

        debug!(
            decision_id = %structured.decision_id,
            decision_type = %structured.decision_type,
            actor = %structured.actor,
            "decision emitted"
        );

        self.emitted.insert(event.decision_id.clone());
        self.records.push(structured.clone());
        Ok(structured)
    }

    /// Close every sink and release the run directory
    pub fn close(mut self) -> TraceResult<Vec<TraceRecord>> {
        for sink in self.sinks.iter_mut() {
            sink.close()?;
        }
        Ok(std::mem::take(&mut self.records))
    }
}
