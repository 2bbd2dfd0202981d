use serde::{Deserialize, Serialize};
use zkrent_common::{Identity, PolicyId, U256};

/// Escrow records are keyed by `(policy, tenant)`
pub type LeaseKey = (PolicyId, Identity);

/// Funds held for a tenant under a policy.
///
/// `active` goes true -> false exactly once per lease instance, on release
/// or refund. A later deposit for the same key replaces the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub tenant: Identity,
    pub amount: U256,
    /// Copied from the policy at deposit time
    pub deadline: u64,
    pub active: bool,
}

impl Lease {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Refundable once `now` is strictly past the deadline
    pub fn is_refundable(&self, now: u64) -> bool {
        self.active && now > self.deadline
    }
}
