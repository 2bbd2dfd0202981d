//! Signed-attestation gate
//!
//! Trusts a single attestor identity, rotatable by the gate owner. An
//! attestation is accepted only if it is unexpired, signed by the current
//! attestor under this gate's signing domain, passes all three checks,
//! carries an unused nullifier and names the caller as its wallet.

use crate::nullifier::NullifierStore;
use crate::state::GateState;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zkrent_common::attestation::verify_signature;
use zkrent_common::{
    Attestation, AttestationSignature, Clock, EligibilityOracle, Error, Event, EventSink,
    Identity, Nullifier, PolicyId, Result, SigningDomain,
};

struct Inner {
    owner: Identity,
    attestor: Identity,
    state: GateState,
}

pub struct AttestationGate {
    domain: SigningDomain,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    inner: Mutex<Inner>,
}

impl AttestationGate {
    /// Create a gate owned by `owner` that trusts `attestor`.
    /// Both identities must be non-null.
    pub fn new(
        owner: Identity,
        attestor: Identity,
        domain: SigningDomain,
        nullifiers: Box<dyn NullifierStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        if owner.is_zero() {
            return Err(Error::InvalidParameter("owner must be non-null".to_string()));
        }
        if attestor.is_zero() {
            return Err(Error::InvalidParameter("attestor must be non-null".to_string()));
        }
        Ok(Self {
            domain,
            clock,
            events,
            inner: Mutex::new(Inner {
                owner,
                attestor,
                state: GateState::new(nullifiers),
            }),
        })
    }

    pub fn submit_attestation(
        &self,
        caller: &Identity,
        attestation: &Attestation,
        signature: &AttestationSignature,
    ) -> Result<()> {
        let now = self.clock.now();
        if now > attestation.expiry {
            debug!(expiry = attestation.expiry, now, "Attestation expired");
            return Err(Error::Expired);
        }

        let mut inner = self.inner.lock();

        let digest = self.domain.signing_digest(attestation);
        if !verify_signature(&inner.attestor, &digest, signature) {
            warn!(
                wallet = %attestation.wallet,
                policy_id = %attestation.policy_id,
                "Attestation not signed by the configured attestor"
            );
            return Err(Error::InvalidSignature);
        }

        if !attestation.passes_all() {
            debug!(bitmask = attestation.pass_bitmask, "Attestation missing a passed check");
            return Err(Error::IncompleteVerification);
        }

        inner.state.ensure_unused(&attestation.nullifier)?;

        if attestation.wallet != *caller {
            debug!(wallet = %attestation.wallet, caller = %caller, "Attestation wallet mismatch");
            return Err(Error::CallerMismatch);
        }

        inner
            .state
            .commit(&attestation.nullifier, attestation.policy_id, *caller)?;
        drop(inner);

        info!(
            policy_id = %attestation.policy_id,
            caller = %caller,
            "Eligibility granted via attestation, nullifier {}",
            attestation.nullifier
        );
        self.events.emit(Event::Eligible {
            caller: *caller,
            policy_id: attestation.policy_id,
            nullifier: attestation.nullifier,
        });
        Ok(())
    }

    /// Rotate the trusted attestor. Owner only.
    pub fn set_attestor(&self, caller: &Identity, new_attestor: Identity) -> Result<()> {
        let mut inner = self.inner.lock();
        if *caller != inner.owner {
            return Err(Error::NotOwner);
        }
        if new_attestor.is_zero() {
            return Err(Error::InvalidParameter("attestor must be non-null".to_string()));
        }
        let old = std::mem::replace(&mut inner.attestor, new_attestor);
        drop(inner);

        info!(old = %old, new = %new_attestor, "Attestor rotated");
        self.events.emit(Event::AttestorUpdated {
            old_identity: old,
            new_identity: new_attestor,
        });
        Ok(())
    }

    /// Hand the owner role to `new_owner`. Owner only.
    pub fn transfer_ownership(&self, caller: &Identity, new_owner: Identity) -> Result<()> {
        let mut inner = self.inner.lock();
        if *caller != inner.owner {
            return Err(Error::NotOwner);
        }
        if new_owner.is_zero() {
            return Err(Error::InvalidParameter("owner must be non-null".to_string()));
        }
        let previous = std::mem::replace(&mut inner.owner, new_owner);
        drop(inner);

        info!(previous = %previous, new = %new_owner, "Gate ownership transferred");
        self.events.emit(Event::OwnershipTransferred {
            previous_owner: previous,
            new_owner,
        });
        Ok(())
    }

    pub fn attestor(&self) -> Identity {
        self.inner.lock().attestor
    }

    pub fn owner(&self) -> Identity {
        self.inner.lock().owner
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    pub fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> bool {
        self.inner.lock().state.is_eligible(policy_id, who)
    }

    pub fn is_nullifier_used(&self, nullifier: &Nullifier) -> Result<bool> {
        self.inner.lock().state.is_nullifier_used(nullifier)
    }
}

impl EligibilityOracle for AttestationGate {
    fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> bool {
        AttestationGate::is_eligible(self, policy_id, who)
    }
}
