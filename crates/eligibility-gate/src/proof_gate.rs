//! Zero-knowledge proof gate
//!
//! The verification flow is:
//! 1. Require exactly seven public inputs
//! 2. Load the policy and reject it once its deadline has passed
//! 3. Cross-check inputs 0..=4 against the on-record policy terms
//! 4. Rebuild the nullifier from inputs 5 (high) and 6 (low)
//! 5. Reject a used nullifier (cheap, before the expensive verification)
//! 6. Ask the verifier
//! 7. Mark the nullifier used and the caller eligible
//!
//! The gate lock is held from step 5 through step 7, so a failure at any
//! step leaves no trace.

use crate::nullifier::NullifierStore;
use crate::state::GateState;
use crate::verifier::Verifier;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zkrent_common::inputs::index;
use zkrent_common::{
    Clock, EligibilityOracle, Error, Event, EventSink, Identity, Nullifier, Policy, PolicyId,
    PublicInputField, PublicInputs, Result, U256,
};
use zkrent_policy_registry::PolicyRegistry;

pub struct ProofGate {
    registry: Arc<PolicyRegistry>,
    verifier: Arc<dyn Verifier>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    state: Mutex<GateState>,
}

impl ProofGate {
    pub fn new(
        registry: Arc<PolicyRegistry>,
        verifier: Arc<dyn Verifier>,
        nullifiers: Box<dyn NullifierStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            verifier,
            clock,
            events,
            state: Mutex::new(GateState::new(nullifiers)),
        }
    }

    /// Verify `proof` for `policy_id` and mark `caller` eligible.
    /// Returns the consumed nullifier.
    pub fn submit_proof(
        &self,
        caller: &Identity,
        policy_id: PolicyId,
        proof: &[u8],
        public_inputs: &[U256],
    ) -> Result<Nullifier> {
        let inputs = PublicInputs::from_slice(public_inputs).ok_or_else(|| {
            debug!(count = public_inputs.len(), "Wrong number of public inputs");
            Error::InvalidInputShape(public_inputs.len())
        })?;

        let policy = self.registry.get_policy(policy_id)?;
        let now = self.clock.now();
        if policy.is_expired(now) {
            debug!(%policy_id, deadline = policy.deadline, now, "Policy deadline passed");
            return Err(Error::DeadlinePassed);
        }

        check_policy_binding(&policy, &inputs)?;

        let nullifier = Nullifier::from_halves(
            &inputs.0[index::NULLIFIER_HIGH],
            &inputs.0[index::NULLIFIER_LOW],
        )
        .ok_or_else(|| {
            debug!("Nullifier half exceeds 128 bits");
            Error::InvalidInputShape(public_inputs.len())
        })?;

        let mut state = self.state.lock();
        state.ensure_unused(&nullifier)?;

        if !self.verifier.verify(proof, &inputs) {
            warn!(%policy_id, caller = %caller, "Proof verification failed");
            return Err(Error::InvalidProof);
        }

        state.commit(&nullifier, policy_id, *caller)?;
        drop(state);

        info!(
            %policy_id,
            caller = %caller,
            "Eligibility granted via proof, nullifier {}",
            nullifier
        );
        self.events.emit(Event::Eligible {
            caller: *caller,
            policy_id,
            nullifier,
        });

        Ok(nullifier)
    }

    pub fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> bool {
        self.state.lock().is_eligible(policy_id, who)
    }

    pub fn is_nullifier_used(&self, nullifier: &Nullifier) -> Result<bool> {
        self.state.lock().is_nullifier_used(nullifier)
    }
}

impl EligibilityOracle for ProofGate {
    fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> bool {
        ProofGate::is_eligible(self, policy_id, who)
    }
}

/// Binds the proof to the exact on-record terms, field by field
fn check_policy_binding(policy: &Policy, inputs: &PublicInputs) -> Result<()> {
    let expected = [
        (index::MIN_AGE, U256::from(policy.min_age), PublicInputField::MinAge),
        (
            index::INCOME_MULTIPLIER,
            U256::from(policy.income_multiplier),
            PublicInputField::IncomeMultiplier,
        ),
        (index::RENT_AMOUNT, policy.rent_amount, PublicInputField::RentAmount),
        (
            index::NEEDS_CLEAN_RECORD,
            U256::from(policy.needs_clean_record),
            PublicInputField::NeedsCleanRecord,
        ),
        (index::POLICY_ID, U256::from(policy.id.get()), PublicInputField::PolicyId),
    ];

    for (idx, value, field) in expected {
        if inputs.0[idx] != value {
            debug!(policy_id = %policy.id, %field, "Public input does not match policy");
            return Err(Error::PublicInputMismatch(field));
        }
    }
    Ok(())
}
