// ⏱️ Trace Clock - decision ids and non-decreasing timestamps
//
// The only non-deterministic inputs of a run live here: a v4 UUID per
// decision and the wall-clock time, clamped so it never goes backwards.

use chrono::{DateTime, SecondsFormat, Utc};

/// Identity and time assigned to one decision at emission time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub decision_id: String,
    pub timestamp: String,
}

/// Per-run clock. Timestamps are RFC 3339 UTC with microseconds and `+00:00`.
#[derive(Debug, Default)]
pub struct TraceClock {
    last: Option<DateTime<Utc>>,
}

impl TraceClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self) -> Stamp {
        self.stamp_at(Utc::now())
    }

    /// Stamp with an explicit reading; earlier readings are clamped to the last one
    pub fn stamp_at(&mut self, now: DateTime<Utc>) -> Stamp {
        let at = match self.last {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last = Some(at);

        Stamp {
            decision_id: uuid::Uuid::new_v4().to_string(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }
}

/// Parse a trace timestamp back into UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
