use crate::{PolicyId, U256};
use std::fmt;
use thiserror::Error;

/// Which public input failed the cross-check against the on-record policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicInputField {
    MinAge,
    IncomeMultiplier,
    RentAmount,
    NeedsCleanRecord,
    PolicyId,
}

impl fmt::Display for PublicInputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MinAge => "minAge",
            Self::IncomeMultiplier => "incomeMultiplier",
            Self::RentAmount => "rentAmount",
            Self::NeedsCleanRecord => "needsCleanRecord",
            Self::PolicyId => "policyId",
        };
        f.write_str(name)
    }
}

/// Every rejection the registry, gates and escrow can produce.
/// A failed call leaves all state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Deadline must be in the future")]
    InvalidDeadline,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Policy {0} not found")]
    NotFound(PolicyId),

    #[error("Expected 7 public inputs, got {0}")]
    InvalidInputShape(usize),

    #[error("Policy deadline has passed")]
    DeadlinePassed,

    #[error("Public input mismatch: {0}")]
    PublicInputMismatch(PublicInputField),

    #[error("Nullifier replay detected")]
    NullifierReused,

    #[error("Invalid proof")]
    InvalidProof,

    #[error("Attestation expired")]
    Expired,

    #[error("Invalid attestation signature")]
    InvalidSignature,

    #[error("Attestation does not pass every check")]
    IncompleteVerification,

    #[error("Attestation wallet does not match caller")]
    CallerMismatch,

    #[error("Caller is not eligible for this policy")]
    NotEligible,

    #[error("Wrong payment amount: expected {expected}, got {actual}")]
    WrongAmount { expected: U256, actual: U256 },

    #[error("An active lease already exists")]
    LeaseExists,

    #[error("Caller is not the owner")]
    NotOwner,

    #[error("Lease is not active")]
    LeaseNotActive,

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Lease deadline not reached")]
    DeadlineNotReached,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;
