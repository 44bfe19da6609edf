// 🔀 Projections - one canonical event, two sink shapes
//
// structured_record → decision_trace.jsonl (flat, sorted keys)
// audit_record      → audit_trace.db (normalized, parallel audit ids)
//
// Both go through event_maps so the policy tag and payload never diverge.

use crate::error::{TraceError, TraceResult};
use crate::trace::event::{DecisionEvent, TraceRecord};
use crate::trace::payload::PayloadMaps;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

pub const AUDIT_TENANT: &str = "budget-trace";
pub const AUDIT_ENVIRONMENT: &str = "local";
pub const AUDIT_ACTOR_TYPE: &str = "agent";

const POLICY_TAG_KEY: &str = "policy_id";

/// Row shape of the audit sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: String,
    pub parent_audit_id: Option<String>,
    pub decision_id: String,
    pub tenant: String,
    pub environment: String,
    pub actor_id: String,
    pub actor_type: String,
    pub decision_type: String,
    pub timestamp: String,

    /// {context, evidence, outcome, confidence, lineage}
    pub payload: Value,
}

/// Parallel identifier for the audit sink, stable for a given decision id
pub fn audit_id_for(decision_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(decision_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("aud_{}", &digest[..32])
}

fn require(value: &str, field: &str) -> TraceResult<()> {
    if value.trim().is_empty() {
        return Err(TraceError::MissingField(field.to_string()));
    }
    Ok(())
}

/// Payload maps with the policy tag merged into the context (an existing key wins)
fn event_maps(event: &DecisionEvent) -> TraceResult<PayloadMaps> {
    require(&event.decision_id, "decision_id")?;
    require(&event.timestamp, "timestamp")?;
    if event.lineage.iter().any(|parent| parent.trim().is_empty()) {
        return Err(TraceError::MissingField("lineage".to_string()));
    }

    let (mut context, evidence, outcome) = event.payload.to_maps()?;
    if let Some(policy_id) = &event.policy_id {
        context
            .entry(POLICY_TAG_KEY.to_string())
            .or_insert_with(|| Value::from(policy_id.as_str()));
    }
    Ok((context, evidence, outcome))
}

pub fn structured_record(event: &DecisionEvent) -> TraceResult<TraceRecord> {
    let (context, evidence, outcome) = event_maps(event)?;

    Ok(TraceRecord {
        actor: event.actor,
        confidence: event.confidence,
        context,
        decision_id: event.decision_id.clone(),
        decision_type: event.decision_type(),
        evidence,
        lineage: event.lineage.clone(),
        outcome,
        timestamp: event.timestamp.clone(),
    })
}

pub fn audit_record(event: &DecisionEvent) -> TraceResult<AuditRecord> {
    let (context, evidence, outcome) = event_maps(event)?;

    Ok(AuditRecord {
        audit_id: audit_id_for(&event.decision_id),
        parent_audit_id: event.parent().map(audit_id_for),
        decision_id: event.decision_id.clone(),
        tenant: AUDIT_TENANT.to_string(),
        environment: AUDIT_ENVIRONMENT.to_string(),
        actor_id: event.actor.as_str().to_string(),
        actor_type: AUDIT_ACTOR_TYPE.to_string(),
        decision_type: event.decision_type().as_str().to_string(),
        timestamp: event.timestamp.clone(),
        payload: json!({
            "context": Value::Object(context),
            "evidence": Value::Object(evidence),
            "outcome": Value::Object(outcome),
            "confidence": event.confidence,
            "lineage": event.lineage,
        }),
    })
}

impl AuditRecord {
    pub fn payload_map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.payload.get(key).and_then(Value::as_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::clock::Stamp;
    use crate::trace::event::Actor;
    use crate::trace::payload::{
        DecisionPayload, DriversEvidence, DriversOutcome, PersonaContext, Stage, StageStatus,
    };
    use crate::spend::Driver;

    fn drivers_event(lineage: Vec<String>) -> DecisionEvent {
        let payload = DecisionPayload::TopDriversIdentified(Stage {
            context: PersonaContext {
                persona: "sports_fan".to_string(),
            },
            evidence: DriversEvidence {
                protected_categories: vec!["Groceries".to_string(), "Rent".to_string()],
                discretionary_candidates: vec![Driver {
                    category: "Sports".to_string(),
                    amount: 240.0,
                }],
            },
            outcome: DriversOutcome {
                top_drivers: vec![Driver {
                    category: "Sports".to_string(),
                    amount: 240.0,
                }],
                status: StageStatus::Identified,
            },
        });
        let stamp = Stamp {
            decision_id: "22222222-2222-4222-8222-222222222222".to_string(),
            timestamp: "2025-01-01T00:00:01.000000+00:00".to_string(),
        };
        DecisionEvent::new(stamp, Actor::SpendAnalystAgent, payload, 0.97, lineage).unwrap()
    }

    #[test]
    fn test_projections_stay_in_sync() {
        let event = drivers_event(vec!["root-id".to_string()]).with_policy_tag(Some("budget-policy-v1"));

        let structured = structured_record(&event).unwrap();
        let audit = audit_record(&event).unwrap();

        assert_eq!(structured.decision_id, audit.decision_id);
        assert_eq!(structured.timestamp, audit.timestamp);
        assert_eq!(structured.actor.as_str(), audit.actor_id);
        assert_eq!(structured.decision_type.as_str(), audit.decision_type);
        assert_eq!(Some(&structured.context), audit.payload_map("context"));
        assert_eq!(Some(&structured.evidence), audit.payload_map("evidence"));
        assert_eq!(Some(&structured.outcome), audit.payload_map("outcome"));
        assert_eq!(audit.payload["confidence"], json!(structured.confidence));
        assert_eq!(audit.payload["lineage"], json!(structured.lineage));

        assert_eq!(structured.context["policy_id"], "budget-policy-v1");
    }

    #[test]
    fn test_parent_mapping_preserved() {
        let event = drivers_event(vec!["root-id".to_string()]);
        let audit = audit_record(&event).unwrap();

        assert_eq!(audit.audit_id, audit_id_for(&event.decision_id));
        assert_eq!(audit.parent_audit_id, Some(audit_id_for("root-id")));
        assert_eq!(audit.tenant, AUDIT_TENANT);

        let root = audit_record(&drivers_event(vec![])).unwrap();
        assert_eq!(root.parent_audit_id, None);
    }

    #[test]
    fn test_audit_id_is_stable() {
        assert_eq!(audit_id_for("abc"), audit_id_for("abc"));
        assert_ne!(audit_id_for("abc"), audit_id_for("abd"));
        assert_eq!(audit_id_for("abc").len(), 36);
    }

    #[test]
    fn test_blank_id_rejected_by_both() {
        let mut event = drivers_event(vec![]);
        event.decision_id = String::new();

        assert!(matches!(structured_record(&event), Err(TraceError::MissingField(f)) if f == "decision_id"));
        assert!(matches!(audit_record(&event), Err(TraceError::MissingField(_))));
    }
}
