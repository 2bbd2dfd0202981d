use crate::{Identity, PolicyId, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A one-time token for preventing proof and attestation replay.
/// Derived from (identity or proof witness, policy id, secret salt); once a
/// gate marks it used it stays used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    /// Create a new nullifier from a 32-byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a nullifier the way attestation issuers do:
    /// `SHA256(identity || policy_id (be u64) || salt)`
    pub fn derive(identity: &Identity, policy_id: PolicyId, salt: &[u8; 32]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        hasher.update(policy_id.get().to_be_bytes());
        hasher.update(salt);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Rebuild a nullifier from the two 128-bit proof public inputs.
    /// Returns `None` when either half does not fit in 128 bits.
    pub fn from_halves(high: &U256, low: &U256) -> Option<Self> {
        if !high.fits_u128() || !low.fits_u128() {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(&high.low_u128().to_be_bytes());
        bytes[16..].copy_from_slice(&low.low_u128().to_be_bytes());
        Some(Self(bytes))
    }

    /// Split into (high 128 bits, low 128 bits), the proof public-input form
    pub fn to_halves(&self) -> (U256, U256) {
        let value = U256::from_be_bytes(self.0);
        (
            U256::from(value.high_u128()),
            U256::from(value.low_u128()),
        )
    }

    /// Get the inner bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hexadecimal string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
