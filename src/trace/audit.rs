// 🗄️ Audit Sink - SQLite compliance store (audit_trace.db)
//
// WAL + synchronous=FULL, autocommit per event: once insert() returns, the
// row is durable. Rows are keyed by the parallel audit id.

use crate::error::TraceResult;
use crate::trace::projection::AuditRecord;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

pub struct AuditSink {
    conn: Connection,
}

fn setup_audit_schema(conn: &Connection) -> TraceResult<()> {
    // WAL for crash recovery, FULL so each commit reaches disk
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "FULL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            audit_id TEXT UNIQUE NOT NULL,
            parent_audit_id TEXT,
            decision_id TEXT UNIQUE NOT NULL,
            tenant TEXT NOT NULL,
            environment TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            actor_type TEXT NOT NULL,
            decision_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_parent ON audit_events(parent_audit_id)",
        [],
    )?;

    Ok(())
}

impl AuditSink {
    pub fn open(db_path: &Path) -> TraceResult<Self> {
        let conn = Connection::open(db_path)?;
        setup_audit_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert(&self, record: &AuditRecord) -> TraceResult<()> {
        let payload = serde_json::to_string(&record.payload)?;

        self.conn.execute(
            "INSERT INTO audit_events (
                audit_id, parent_audit_id, decision_id, tenant, environment,
                actor_id, actor_type, decision_type, timestamp, payload
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.audit_id,
                record.parent_audit_id,
                record.decision_id,
                record.tenant,
                record.environment,
                record.actor_id,
                record.actor_type,
                record.decision_type,
                record.timestamp,
                payload,
            ],
        )?;

        Ok(())
    }

    pub fn count(&self) -> TraceResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM audit_events", [], |row| row.get(0))?)
    }
}

/// Read every audit row in insertion order. The database is opened
/// read-only, so a missing file is an error rather than a new empty store.
pub fn read_audit_records(db_path: &Path) -> TraceResult<Vec<AuditRecord>> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(
        "SELECT audit_id, parent_audit_id, decision_id, tenant, environment,
                actor_id, actor_type, decision_type, timestamp, payload
         FROM audit_events ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            AuditRecord {
                audit_id: row.get(0)?,
                parent_audit_id: row.get(1)?,
                decision_id: row.get(2)?,
                tenant: row.get(3)?,
                environment: row.get(4)?,
                actor_id: row.get(5)?,
                actor_type: row.get(6)?,
                decision_type: row.get(7)?,
                timestamp: row.get(8)?,
                payload: serde_json::Value::Null,
            },
            row.get::<_, String>(9)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (mut record, payload) = row?;
        record.payload = serde_json::from_str(&payload)?;
        records.push(record);
    }

    Ok(records)
}
