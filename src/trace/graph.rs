// 🌳 Decision Graph - the lineage DAG rebuilt from a persisted trace
//
// Rooted at the single zero-lineage event. Parents must appear earlier in
// emission order and must not carry a later timestamp.

use crate::trace::clock::parse_timestamp;
use crate::trace::event::{DecisionType, TraceRecord};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Trace is empty")]
    Empty,

    #[error("Duplicate decision id: {0}")]
    DuplicateId(String),

    #[error("First event {0} must have empty lineage")]
    MissingRoot(String),

    #[error("Event {0} has empty lineage but is not the first event")]
    ExtraRoot(String),

    #[error("Event {child} references unknown parent {parent}")]
    DanglingParent { child: String, parent: String },

    #[error("Event {child} references parent {parent} emitted after it")]
    ForwardReference { child: String, parent: String },
}

#[derive(Debug)]
pub struct DecisionGraph<'a> {
    records: &'a [TraceRecord],
    index: HashMap<&'a str, usize>,
    children: HashMap<&'a str, Vec<usize>>,
}

fn emitted_after(parent: &TraceRecord, child: &TraceRecord) -> bool {
    match (parse_timestamp(&parent.timestamp), parse_timestamp(&child.timestamp)) {
        (Some(p), Some(c)) => p > c,
        _ => parent.timestamp > child.timestamp,
    }
}

impl<'a> DecisionGraph<'a> {
    pub fn from_records(records: &'a [TraceRecord]) -> Result<Self, GraphError> {
        let first = records.first().ok_or(GraphError::Empty)?;
        if !first.lineage.is_empty() {
            return Err(GraphError::MissingRoot(first.decision_id.clone()));
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.decision_id.as_str(), position).is_some() {
                return Err(GraphError::DuplicateId(record.decision_id.clone()));
            }
        }

        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (position, record) in records.iter().enumerate().skip(1) {
            if record.lineage.is_empty() {
                return Err(GraphError::ExtraRoot(record.decision_id.clone()));
            }

            for parent in &record.lineage {
                let parent_position = *index.get(parent.as_str()).ok_or_else(|| GraphError::DanglingParent {
                    child: record.decision_id.clone(),
                    parent: parent.clone(),
                })?;

                if parent_position >= position || emitted_after(&records[parent_position], record) {
                    return Err(GraphError::ForwardReference {
                        child: record.decision_id.clone(),
                        parent: parent.clone(),
                    });
                }

                children
                    .entry(records[parent_position].decision_id.as_str())
                    .or_default()
                    .push(position);
            }
        }

        Ok(Self {
            records,
            index,
            children,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn root(&self) -> &'a TraceRecord {
        // from_records rejects empty traces
        &self.records[0]
    }

    pub fn get(&self, decision_id: &str) -> Option<&'a TraceRecord> {
        self.index.get(decision_id).map(|&i| &self.records[i])
    }

    pub fn parents(&self, decision_id: &str) -> Vec<&'a TraceRecord> {
        self.get(decision_id)
            .map(|record| record.lineage.iter().filter_map(|p| self.get(p)).collect())
            .unwrap_or_default()
    }

    pub fn children(&self, decision_id: &str) -> Vec<&'a TraceRecord> {
        self.children
            .get(decision_id)
            .map(|positions| positions.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Walk first parents up to the root, nearest first
    pub fn ancestors(&self, decision_id: &str) -> Vec<&'a TraceRecord> {
        let mut chain = Vec::new();
        let mut current = self.get(decision_id);
        while let Some(record) = current {
            current = record.lineage.first().and_then(|p| self.get(p));
            if let Some(parent) = current {
                chain.push(parent);
            }
        }
        chain
    }

    pub fn of_type(&self, decision_type: DecisionType) -> Vec<&'a TraceRecord> {
        self.records
            .iter()
            .filter(|r| r.decision_type == decision_type)
            .collect()
    }

    /// One chain per proposal: proposal → policy → risk, continuing through
    /// selection and publication for the winner
    pub fn plan_chains(&self) -> Vec<Vec<&'a TraceRecord>> {
        self.of_type(DecisionType::PlanProposed)
            .into_iter()
            .map(|proposal| {
                let mut chain = vec![proposal];
                let mut current = proposal;
                loop {
                    let next = self.children(&current.decision_id);
                    match next.as_slice() {
                        [only] => {
                            chain.push(*only);
                            current = *only;
                        }
                        _ => break,
                    }
                }
                chain
            })
            .collect()
    }
}
