use crate::{Error, PublicInputs, Result};
use serde::{Deserialize, Serialize};

/// What an eligibility guest program commits to its journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityJournal {
    pub public_inputs: PublicInputs,
}

/// A wrapper around a RISC Zero receipt (proof)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Serialized RISC Zero receipt
    pub inner: Vec<u8>,
}

impl Receipt {
    pub fn new(inner: Vec<u8>) -> Self {
        Self { inner }
    }

    /// Get the size of the serialized proof
    pub fn proof_size(&self) -> usize {
        self.inner.len()
    }

    fn decode(&self) -> Result<risc0_zkvm::Receipt> {
        let (receipt, _): (risc0_zkvm::Receipt, usize) =
            bincode::serde::decode_from_slice(&self.inner, bincode::config::standard())
                .map_err(|e| {
                    tracing::debug!("Failed to decode receipt: {}", e);
                    Error::InvalidProof
                })?;
        Ok(receipt)
    }

    /// Verify the proof against the expected guest image and return the
    /// journal it committed.
    pub fn verify_and_decode(&self, expected_image_id: &[u8; 32]) -> Result<EligibilityJournal> {
        let receipt = self.decode()?;

        receipt.verify(*expected_image_id).map_err(|e| {
            tracing::warn!("Receipt verification failed: {}", e);
            Error::InvalidProof
        })?;

        receipt.journal.decode().map_err(|e| {
            tracing::warn!("Receipt journal is not an eligibility journal: {}", e);
            Error::InvalidProof
        })
    }
}
