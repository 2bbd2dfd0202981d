//! Bookkeeping shared by both gates: the used-nullifier set and the
//! write-once eligibility flags, both held by the gate's `NullifierStore`.
//! Each gate owns its own store; gates never share nullifiers.

use crate::nullifier::NullifierStore;
use tracing::{error, warn};
use zkrent_common::{Error, Identity, Nullifier, PolicyId, Result};

pub(crate) struct GateState {
    store: Box<dyn NullifierStore>,
}

impl GateState {
    pub(crate) fn new(store: Box<dyn NullifierStore>) -> Self {
        Self { store }
    }

    pub(crate) fn ensure_unused(&self, nullifier: &Nullifier) -> Result<()> {
        if self.store.is_used(nullifier)? {
            warn!("Nullifier replay detected: {}", nullifier);
            return Err(Error::NullifierReused);
        }
        Ok(())
    }

    /// Mark the nullifier used and the caller eligible. Last step of a
    /// submission; nothing may fail after it.
    pub(crate) fn commit(
        &mut self,
        nullifier: &Nullifier,
        policy_id: PolicyId,
        who: Identity,
    ) -> Result<()> {
        if !self.store.consume(nullifier, policy_id, &who)? {
            // Lost a race against another process sharing the store
            warn!("Nullifier consumed concurrently: {}", nullifier);
            return Err(Error::NullifierReused);
        }
        Ok(())
    }

    /// A store that cannot be read answers "not eligible"
    pub(crate) fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> bool {
        self.store.is_eligible(policy_id, who).unwrap_or_else(|e| {
            error!(%policy_id, who = %who, "Eligibility lookup failed: {}", e);
            false
        })
    }

    pub(crate) fn is_nullifier_used(&self, nullifier: &Nullifier) -> Result<bool> {
        self.store.is_used(nullifier)
    }
}
