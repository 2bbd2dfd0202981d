//! Eligibility Gates
//!
//! Convert an unverified zero-knowledge proof or signed attestation into a
//! persisted eligibility fact for `(policy, caller)`. Both gates consume
//! each nullifier at most once and expose the result through
//! `EligibilityOracle`.

pub mod attestation_gate;
pub mod nullifier;
pub mod proof_gate;
mod state;
pub mod verifier;

pub use attestation_gate::AttestationGate;
pub use nullifier::{MemoryNullifierStore, NullifierStore, RedisNullifierStore};
pub use proof_gate::ProofGate;
#[cfg(any(test, feature = "test-utils"))]
pub use verifier::AcceptAllVerifier;
#[cfg(feature = "risc0")]
pub use verifier::Risc0Verifier;
pub use verifier::Verifier;
