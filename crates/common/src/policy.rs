//! Policy records and their commitment hash

use crate::encoding::{hash_words, word_bool, word_identity, word_u256, word_u64};
use crate::{Identity, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense, 1-based policy identifier. `0` never names a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(u64);

impl PolicyId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PolicyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Terms supplied by the owner when creating a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTerms {
    pub min_age: u64,
    pub income_multiplier: u64,
    /// Exact rent, in native currency units, a tenant must deposit
    pub rent_amount: U256,
    pub needs_clean_record: bool,
    /// Unix timestamp (seconds)
    pub deadline: u64,
}

/// A registered, immutable policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub min_age: u64,
    pub income_multiplier: u64,
    pub rent_amount: U256,
    pub needs_clean_record: bool,
    pub deadline: u64,
    pub owner: Identity,
    #[serde(with = "hex_bytes")]
    pub commitment_hash: [u8; 32],
}

impl Policy {
    /// Build a policy record, computing its commitment hash
    pub fn new(id: PolicyId, terms: PolicyTerms, owner: Identity) -> Self {
        let commitment_hash = commitment_hash(&terms, &owner);
        Self {
            id,
            min_age: terms.min_age,
            income_multiplier: terms.income_multiplier,
            rent_amount: terms.rent_amount,
            needs_clean_record: terms.needs_clean_record,
            deadline: terms.deadline,
            owner,
            commitment_hash,
        }
    }

    pub fn terms(&self) -> PolicyTerms {
        PolicyTerms {
            min_age: self.min_age,
            income_multiplier: self.income_multiplier,
            rent_amount: self.rent_amount,
            needs_clean_record: self.needs_clean_record,
            deadline: self.deadline,
        }
    }

    /// Recompute the commitment over the stored terms and compare
    pub fn verify_commitment(&self) -> bool {
        commitment_hash(&self.terms(), &self.owner) == self.commitment_hash
    }

    /// True once `now` is strictly past the deadline
    pub fn is_expired(&self, now: u64) -> bool {
        self.deadline < now
    }
}

/// `SHA256(word(minAge) || word(incomeMultiplier) || word(rentAmount) ||
/// word(needsCleanRecord) || word(deadline) || owner)`
pub fn commitment_hash(terms: &PolicyTerms, owner: &Identity) -> [u8; 32] {
    hash_words(&[
        word_u64(terms.min_age),
        word_u64(terms.income_multiplier),
        word_u256(&terms.rent_amount),
        word_bool(terms.needs_clean_record),
        word_u64(terms.deadline),
        word_identity(owner),
    ])
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> PolicyTerms {
        PolicyTerms {
            min_age: 18,
            income_multiplier: 3,
            rent_amount: U256::from(1_000_000u64),
            needs_clean_record: true,
            deadline: 1_700_000_000,
        }
    }

    #[test]
    fn test_commitment_binds_every_field() {
        let owner = Identity::from_label("owner");
        let base = commitment_hash(&terms(), &owner);

        let mut t = terms();
        t.min_age = 21;
        assert_ne!(commitment_hash(&t, &owner), base);

        let mut t = terms();
        t.needs_clean_record = false;
        assert_ne!(commitment_hash(&t, &owner), base);

        let mut t = terms();
        t.rent_amount = U256::from(999_999u64);
        assert_ne!(commitment_hash(&t, &owner), base);

        assert_ne!(commitment_hash(&terms(), &Identity::from_label("other")), base);
    }

    #[test]
    fn test_policy_verify_commitment_detects_tampering() {
        let mut policy = Policy::new(PolicyId::new(1), terms(), Identity::from_label("owner"));
        assert!(policy.verify_commitment());
        policy.rent_amount = U256::from(1u64);
        assert!(!policy.verify_commitment());
    }

    #[test]
    fn test_policy_json_shape() {
        let policy = Policy::new(PolicyId::new(3), terms(), Identity::from_label("owner"));
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["rent_amount"], "1000000");
        let back: Policy = serde_json::from_value(json).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_is_expired_is_strict() {
        let policy = Policy::new(PolicyId::new(1), terms(), Identity::from_label("owner"));
        assert!(!policy.is_expired(policy.deadline));
        assert!(policy.is_expired(policy.deadline + 1));
    }
}
