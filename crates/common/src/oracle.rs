use crate::{Identity, PolicyId};

/// Answers "has this caller proven eligibility for this policy".
///
/// Implemented by both the proof gate and the attestation gate; the escrow
/// depends only on this trait.
pub trait EligibilityOracle: Send + Sync {
    fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> bool;
}

impl<T: EligibilityOracle + ?Sized> EligibilityOracle for std::sync::Arc<T> {
    fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> bool {
        (**self).is_eligible(policy_id, who)
    }
}
