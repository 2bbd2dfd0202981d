//! Signed eligibility attestations
//!
//! An attestation is produced off-chain by the attestation-issuing service
//! and consumed exactly once by the attestation gate. The signature covers a
//! domain-separated digest of the structured fields:
//!
//! ```text
//! domainSeparator = SHA256(DOMAIN_TYPEHASH || SHA256(name) || SHA256(version)
//!                          || word(chainContext) || gateAddress)
//! structHash      = SHA256(ATTESTATION_TYPEHASH || wallet || word(policyId)
//!                          || word(expiry) || nullifier || word(passBitmask))
//! digest          = SHA256(0x19 || 0x01 || domainSeparator || structHash)
//! ```
//!
//! Signatures are ed25519; the attestor's identity is its verifying key.

use crate::encoding::{hash_words, sha256, word_identity, word_u64};
use crate::{Error, Identity, Nullifier, PolicyId, Result};
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Domain name every attestation is signed under
pub const DOMAIN_NAME: &str = "ZKPRent-TLS";

/// Domain version every attestation is signed under
pub const DOMAIN_VERSION: &str = "1";

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const ATTESTATION_TYPE: &str =
    "Attestation(address wallet,uint256 policyId,uint64 expiry,bytes32 nullifier,uint8 passBitmask)";

/// Bit 0: age check passed
pub const PASS_AGE: u8 = 0b001;
/// Bit 1: income check passed
pub const PASS_INCOME: u8 = 0b010;
/// Bit 2: clean-record check passed
pub const PASS_CLEAN_RECORD: u8 = 0b100;
/// All three checks passed
pub const PASS_ALL: u8 = PASS_AGE | PASS_INCOME | PASS_CLEAN_RECORD;

/// The structured statement an attestor signs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub wallet: Identity,
    pub policy_id: PolicyId,
    /// Unix timestamp (seconds) after which the attestation is rejected
    pub expiry: u64,
    pub nullifier: Nullifier,
    pub pass_bitmask: u8,
}

impl Attestation {
    /// True only when the age, income and clean-record bits are all set
    pub fn passes_all(&self) -> bool {
        self.pass_bitmask & PASS_ALL == PASS_ALL
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        hash_words(&[
            sha256(ATTESTATION_TYPE.as_bytes()),
            word_identity(&self.wallet),
            word_u64(self.policy_id.get()),
            word_u64(self.expiry),
            *self.nullifier.as_bytes(),
            word_u64(self.pass_bitmask as u64),
        ])
    }
}

/// Domain the attestation signature is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    pub name: String,
    pub version: String,
    pub chain_context: u64,
    pub gate_address: Identity,
}

impl SigningDomain {
    /// The fixed `("ZKPRent-TLS", "1")` domain for a chain context and gate
    pub fn new(chain_context: u64, gate_address: Identity) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_context,
            gate_address,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        hash_words(&[
            sha256(DOMAIN_TYPE.as_bytes()),
            sha256(self.name.as_bytes()),
            sha256(self.version.as_bytes()),
            word_u64(self.chain_context),
            word_identity(&self.gate_address),
        ])
    }

    /// The digest an attestor signs for `attestation` under this domain
    pub fn signing_digest(&self, attestation: &Attestation) -> [u8; 32] {
        let mut buf = Vec::with_capacity(66);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(&self.separator());
        buf.extend_from_slice(&attestation.struct_hash());
        sha256(&buf)
    }
}

/// A 64-byte ed25519 signature over an attestation digest
#[derive(Clone, PartialEq, Eq)]
pub struct AttestationSignature(pub [u8; 64]);

impl AttestationSignature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from raw bytes, rejecting anything that is not 64 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| {
            Error::InvalidKey(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl std::fmt::Debug for AttestationSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AttestationSignature({}..)", &self.to_hex()[..16])
    }
}

impl Serialize for AttestationSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AttestationSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// What the attestation-issuing service hands back to a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedAttestation {
    pub attestation: Attestation,
    pub signature: AttestationSignature,
    pub domain: SigningDomain,
}

/// Returns true when `signature` is a valid signature by `signer` over `digest`.
/// A signer that is not a valid ed25519 point never verifies.
pub fn verify_signature(
    signer: &Identity,
    digest: &[u8; 32],
    signature: &AttestationSignature,
) -> bool {
    let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify(digest, &sig).is_ok()
}

/// Attestor signing key. Not serializable; the secret never leaves this type
/// except through `to_secret_hex` for key export.
pub struct AttestorKey {
    signing_key: ed25519_dalek::SigningKey,
}

impl AttestorKey {
    /// Generate a fresh key from the OS RNG
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rng),
        }
    }

    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&secret),
        }
    }

    pub fn from_secret_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| Error::InvalidKey(e.to_string()))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKey("secret key must be 32 bytes".to_string()))?;
        Ok(Self::from_secret_bytes(secret))
    }

    pub fn to_secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The identity gates are configured with to trust this attestor
    pub fn identity(&self) -> Identity {
        Identity(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, domain: &SigningDomain, attestation: &Attestation) -> AttestationSignature {
        let digest = domain.signing_digest(attestation);
        AttestationSignature(self.signing_key.sign(&digest).to_bytes())
    }

    /// Sign and package an attestation the way the issuing service returns it
    pub fn issue(&self, domain: &SigningDomain, attestation: Attestation) -> SignedAttestation {
        let signature = self.sign(domain, &attestation);
        SignedAttestation {
            attestation,
            signature,
            domain: domain.clone(),
        }
    }
}
