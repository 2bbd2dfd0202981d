//! Proof verification capability consumed by the proof gate
//!
//! The gate treats the verifier as an opaque oracle: it learns nothing about
//! a proof beyond the boolean answer.

use zkrent_common::PublicInputs;

pub trait Verifier: Send + Sync {
    fn verify(&self, proof: &[u8], public_inputs: &PublicInputs) -> bool;
}

/// Accepts every proof. Test-only; never configure it in production.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

#[cfg(any(test, feature = "test-utils"))]
impl Verifier for AcceptAllVerifier {
    fn verify(&self, _proof: &[u8], _public_inputs: &PublicInputs) -> bool {
        true
    }
}

/// Verifies RISC Zero receipts produced by the eligibility guest program.
///
/// The proof bytes are a bincode-encoded receipt. It must verify against
/// `image_id` and its journal must commit exactly the supplied inputs.
#[cfg(feature = "risc0")]
#[derive(Debug, Clone)]
pub struct Risc0Verifier {
    image_id: [u8; 32],
}

#[cfg(feature = "risc0")]
impl Risc0Verifier {
    pub fn new(image_id: [u8; 32]) -> Self {
        Self { image_id }
    }

    pub fn image_id(&self) -> &[u8; 32] {
        &self.image_id
    }
}

#[cfg(feature = "risc0")]
impl Verifier for Risc0Verifier {
    fn verify(&self, proof: &[u8], public_inputs: &PublicInputs) -> bool {
        let receipt = zkrent_common::Receipt::new(proof.to_vec());
        match receipt.verify_and_decode(&self.image_id) {
            Ok(journal) if journal.public_inputs == *public_inputs => true,
            Ok(_) => {
                tracing::warn!("Receipt journal does not match the submitted public inputs");
                false
            }
            Err(_) => false,
        }
    }
}

#[cfg(all(test, feature = "risc0"))]
mod risc0_tests {
    use super::*;
    use zkrent_common::U256;

    #[test]
    fn test_risc0_verifier_rejects_garbage() {
        let verifier = Risc0Verifier::new([0u8; 32]);
        assert!(!verifier.verify(&[0xde, 0xad], &PublicInputs([U256::ZERO; 7])));
    }
}
