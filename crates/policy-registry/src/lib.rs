//! Policy Registry
//!
//! Immutable store of policy terms. Policies get dense 1-based ids in
//! creation order and are never mutated or deleted; `0` always reads as
//! not found.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};
use zkrent_common::{
    Clock, Error, Event, EventSink, Identity, Policy, PolicyId, PolicyTerms, Result,
};

pub struct PolicyRegistry {
    // policies[i] has id i + 1
    policies: RwLock<Vec<Policy>>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl PolicyRegistry {
    pub fn new(clock: Arc<dyn Clock>, events: Arc<dyn EventSink>) -> Self {
        Self {
            policies: RwLock::new(Vec::new()),
            clock,
            events,
        }
    }

    /// Register a policy owned by `caller` and return its id.
    ///
    /// Fails with `InvalidDeadline` unless the deadline is strictly in the
    /// future, and with `InvalidParameter` when min age, income multiplier
    /// or rent is zero.
    pub fn create_policy(&self, caller: &Identity, terms: PolicyTerms) -> Result<PolicyId> {
        let now = self.clock.now();
        if terms.deadline <= now {
            debug!(deadline = terms.deadline, now, "rejecting policy: deadline not in the future");
            return Err(Error::InvalidDeadline);
        }
        if terms.min_age == 0 {
            return Err(Error::InvalidParameter("minAge must be non-zero".to_string()));
        }
        if terms.income_multiplier == 0 {
            return Err(Error::InvalidParameter(
                "incomeMultiplier must be non-zero".to_string(),
            ));
        }
        if terms.rent_amount.is_zero() {
            return Err(Error::InvalidParameter("rentAmount must be non-zero".to_string()));
        }

        let policy = {
            let mut policies = self.policies.write();
            let id = PolicyId::new(policies.len() as u64 + 1);
            let policy = Policy::new(id, terms, *caller);
            policies.push(policy.clone());
            policy
        };

        info!(
            policy_id = %policy.id,
            owner = %policy.owner,
            "Policy created, commitment {}",
            hex::encode(policy.commitment_hash)
        );
        self.events.emit(Event::PolicyCreated {
            policy_id: policy.id,
            owner: policy.owner,
            commitment_hash: policy.commitment_hash,
        });

        Ok(policy.id)
    }

    /// Copy of the policy with `id`, or `NotFound`
    pub fn get_policy(&self, id: PolicyId) -> Result<Policy> {
        if id.get() == 0 {
            return Err(Error::NotFound(id));
        }
        let policies = self.policies.read();
        usize::try_from(id.get() - 1)
            .ok()
            .and_then(|idx| policies.get(idx))
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    pub fn policy_exists(&self, id: PolicyId) -> bool {
        self.get_policy(id).is_ok()
    }

    /// Number of registered policies (also the highest assigned id)
    pub fn policy_count(&self) -> u64 {
        self.policies.read().len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkrent_common::{EventLog, ManualClock, U256};

    const NOW: u64 = 1_700_000_000;

    fn setup() -> (PolicyRegistry, Arc<EventLog>) {
        let log = Arc::new(EventLog::new());
        let registry = PolicyRegistry::new(Arc::new(ManualClock::new(NOW)), log.clone());
        (registry, log)
    }

    fn terms() -> PolicyTerms {
        PolicyTerms {
            min_age: 18,
            income_multiplier: 3,
            rent_amount: U256::from(1_000_000u64),
            needs_clean_record: true,
            deadline: NOW + 30 * 86_400,
        }
    }

    #[test]
    fn test_ids_are_dense_and_one_based() {
        let (registry, _) = setup();
        let owner = Identity::from_label("owner");
        assert_eq!(registry.create_policy(&owner, terms()).unwrap(), PolicyId::new(1));
        assert_eq!(registry.create_policy(&owner, terms()).unwrap(), PolicyId::new(2));
        assert_eq!(registry.policy_count(), 2);
    }

    #[test]
    fn test_get_policy_bounds() {
        let (registry, _) = setup();
        let owner = Identity::from_label("owner");
        registry.create_policy(&owner, terms()).unwrap();

        assert_eq!(
            registry.get_policy(PolicyId::new(0)).unwrap_err(),
            Error::NotFound(PolicyId::new(0))
        );
        assert_eq!(
            registry.get_policy(PolicyId::new(2)).unwrap_err(),
            Error::NotFound(PolicyId::new(2))
        );

        let policy = registry.get_policy(PolicyId::new(1)).unwrap();
        assert_eq!(policy.owner, owner);
        assert_eq!(policy.min_age, 18);
        assert!(policy.verify_commitment());
    }

    #[test]
    fn test_deadline_must_be_strictly_future() {
        let (registry, log) = setup();
        let owner = Identity::from_label("owner");

        let mut t = terms();
        t.deadline = NOW;
        assert_eq!(registry.create_policy(&owner, t).unwrap_err(), Error::InvalidDeadline);

        let mut t = terms();
        t.deadline = NOW - 1;
        assert_eq!(registry.create_policy(&owner, t).unwrap_err(), Error::InvalidDeadline);

        assert_eq!(registry.policy_count(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_zero_parameters_rejected() {
        let (registry, _) = setup();
        let owner = Identity::from_label("owner");

        let mut t = terms();
        t.min_age = 0;
        assert!(matches!(registry.create_policy(&owner, t), Err(Error::InvalidParameter(_))));

        let mut t = terms();
        t.income_multiplier = 0;
        assert!(matches!(registry.create_policy(&owner, t), Err(Error::InvalidParameter(_))));

        let mut t = terms();
        t.rent_amount = U256::ZERO;
        assert!(matches!(registry.create_policy(&owner, t), Err(Error::InvalidParameter(_))));

        // needsCleanRecord = false is a legitimate term
        let mut t = terms();
        t.needs_clean_record = false;
        assert!(registry.create_policy(&owner, t).is_ok());
    }

    #[test]
    fn test_creation_event_carries_commitment() {
        let (registry, log) = setup();
        let owner = Identity::from_label("owner");
        let id = registry.create_policy(&owner, terms()).unwrap();
        let policy = registry.get_policy(id).unwrap();

        assert_eq!(
            log.last(),
            Some(Event::PolicyCreated {
                policy_id: id,
                owner,
                commitment_hash: policy.commitment_hash,
            })
        );
    }

    #[test]
    fn test_concurrent_creation_assigns_unique_ids() {
        let (registry, _) = setup();
        let owner = Identity::from_label("owner");
        let mut ids: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| registry.create_policy(&owner, terms()).unwrap().get()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_lookup_returns_what_was_created(count in 1usize..20, lookup_id in 0u64..40) {
                let (registry, _) = setup();
                let owner = Identity::from_label("owner");
                for _ in 0..count {
                    registry.create_policy(&owner, terms()).unwrap();
                }
                let found = registry.get_policy(PolicyId::new(lookup_id));
                if lookup_id >= 1 && lookup_id <= count as u64 {
                    prop_assert_eq!(found.unwrap().id, PolicyId::new(lookup_id));
                } else {
                    prop_assert_eq!(found.unwrap_err(), Error::NotFound(PolicyId::new(lookup_id)));
                }
            }
        }
    }
}
