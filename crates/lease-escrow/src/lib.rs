//! Lease Escrow
//!
//! Holds a tenant's rent for a policy once an `EligibilityOracle` vouches
//! for them, then pays it to the policy owner on confirmation or back to
//! the tenant after the deadline.

pub mod escrow;
pub mod lease;
pub mod transfer;

pub use escrow::LeaseEscrow;
pub use lease::{Lease, LeaseKey};
pub use transfer::{InMemoryLedger, TransferError, ValueTransfer};
