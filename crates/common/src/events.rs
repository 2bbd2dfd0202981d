//! Observable side effects
//!
//! Field order within each variant is part of the external contract and
//! must not change.

use crate::{Identity, Nullifier, PolicyId, U256};
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    PolicyCreated {
        policy_id: PolicyId,
        owner: Identity,
        #[serde(serialize_with = "hex_digest")]
        commitment_hash: [u8; 32],
    },
    Eligible {
        caller: Identity,
        policy_id: PolicyId,
        nullifier: Nullifier,
    },
    AttestorUpdated {
        old_identity: Identity,
        new_identity: Identity,
    },
    OwnershipTransferred {
        previous_owner: Identity,
        new_owner: Identity,
    },
    LeaseStarted {
        policy_id: PolicyId,
        tenant: Identity,
        amount: U256,
        deadline: u64,
    },
    LeaseReleased {
        policy_id: PolicyId,
        tenant: Identity,
        amount: U256,
    },
    LeaseRefunded {
        policy_id: PolicyId,
        tenant: Identity,
        amount: U256,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PolicyCreated { .. } => "PolicyCreated",
            Self::Eligible { .. } => "Eligible",
            Self::AttestorUpdated { .. } => "AttestorUpdated",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::LeaseStarted { .. } => "LeaseStarted",
            Self::LeaseReleased { .. } => "LeaseReleased",
            Self::LeaseRefunded { .. } => "LeaseRefunded",
        }
    }
}

fn hex_digest<S: serde::Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}

/// Receives events after an operation has committed
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Writes each event as a structured log record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(event = event.name(), payload = %json, "event emitted"),
            Err(e) => tracing::error!(event = event.name(), "failed to encode event: {}", e),
        }
    }
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn last(&self) -> Option<Event> {
        self.events.lock().last().cloned()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_preserves_order() {
        let log = EventLog::new();
        let tenant = Identity::from_label("tenant");
        log.emit(Event::LeaseStarted {
            policy_id: PolicyId::new(1),
            tenant,
            amount: U256::from(5u64),
            deadline: 9,
        });
        log.emit(Event::LeaseRefunded {
            policy_id: PolicyId::new(1),
            tenant,
            amount: U256::from(5u64),
        });
        let names: Vec<_> = log.events().iter().map(Event::name).collect();
        assert_eq!(names, vec!["LeaseStarted", "LeaseRefunded"]);
    }

    #[test]
    fn test_event_json_field_order() {
        let event = Event::Eligible {
            caller: Identity::from_label("caller"),
            policy_id: PolicyId::new(2),
            nullifier: Nullifier::new([1u8; 32]),
        };
        let json = serde_json::to_string(&event).unwrap();
        let caller = json.find("\"caller\"").unwrap();
        let policy = json.find("\"policy_id\"").unwrap();
        let nullifier = json.find("\"nullifier\"").unwrap();
        assert!(caller < policy && policy < nullifier);
        assert!(json.starts_with("{\"event\":\"Eligible\""));
    }
}
