//! Shared domain types for the zkrent eligibility gates and lease escrow.

pub mod amount;
pub mod attestation;
pub mod clock;
pub mod encoding;
pub mod error;
pub mod events;
pub mod identity;
pub mod inputs;
pub mod nullifier;
pub mod oracle;
pub mod policy;
#[cfg(feature = "risc0")]
pub mod receipt;

pub use amount::U256;
pub use attestation::{
    Attestation, AttestationSignature, AttestorKey, SignedAttestation, SigningDomain, PASS_AGE,
    PASS_ALL, PASS_CLEAN_RECORD, PASS_INCOME,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, PublicInputField, Result};
pub use events::{Event, EventLog, EventSink, TracingEventSink};
pub use identity::Identity;
pub use inputs::{PublicInputs, PUBLIC_INPUT_COUNT};
pub use nullifier::Nullifier;
pub use oracle::EligibilityOracle;
pub use policy::{Policy, PolicyId, PolicyTerms};
#[cfg(feature = "risc0")]
pub use receipt::{EligibilityJournal, Receipt};
