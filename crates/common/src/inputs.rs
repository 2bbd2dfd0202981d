use crate::{Nullifier, Policy, U256};
use serde::{Deserialize, Serialize};

/// Number of public inputs a proof is verified against
pub const PUBLIC_INPUT_COUNT: usize = 7;

/// Positional layout of the proof public inputs:
/// `[minAge, incomeMultiplier, rentAmount, needsCleanRecord, policyId,
///   nullifierHigh128, nullifierLow128]`
pub mod index {
    pub const MIN_AGE: usize = 0;
    pub const INCOME_MULTIPLIER: usize = 1;
    pub const RENT_AMOUNT: usize = 2;
    pub const NEEDS_CLEAN_RECORD: usize = 3;
    pub const POLICY_ID: usize = 4;
    pub const NULLIFIER_HIGH: usize = 5;
    pub const NULLIFIER_LOW: usize = 6;
}

/// The seven public inputs, in layout order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs(pub [U256; PUBLIC_INPUT_COUNT]);

impl PublicInputs {
    /// Public inputs a prover commits to for `policy` and `nullifier`
    pub fn for_policy(policy: &Policy, nullifier: &Nullifier) -> Self {
        let (high, low) = nullifier.to_halves();
        Self([
            U256::from(policy.min_age),
            U256::from(policy.income_multiplier),
            policy.rent_amount,
            U256::from(policy.needs_clean_record),
            U256::from(policy.id.get()),
            high,
            low,
        ])
    }

    /// Accepts a slice only when it holds exactly seven inputs
    pub fn from_slice(inputs: &[U256]) -> Option<Self> {
        let arr: [U256; PUBLIC_INPUT_COUNT] = inputs.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn as_slice(&self) -> &[U256] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Identity, PolicyId, PolicyTerms};

    #[test]
    fn test_for_policy_layout() {
        let policy = Policy::new(
            PolicyId::new(4),
            PolicyTerms {
                min_age: 18,
                income_multiplier: 3,
                rent_amount: U256::from(1_000_000u64),
                needs_clean_record: true,
                deadline: 10,
            },
            Identity::from_label("owner"),
        );
        let nullifier = Nullifier::new([0xAA; 32]);
        let inputs = PublicInputs::for_policy(&policy, &nullifier);
        assert_eq!(inputs.0[index::MIN_AGE], U256::from(18u64));
        assert_eq!(inputs.0[index::NEEDS_CLEAN_RECORD], U256::ONE);
        assert_eq!(inputs.0[index::POLICY_ID], U256::from(4u64));
        let rebuilt = Nullifier::from_halves(
            &inputs.0[index::NULLIFIER_HIGH],
            &inputs.0[index::NULLIFIER_LOW],
        );
        assert_eq!(rebuilt, Some(nullifier));
    }

    #[test]
    fn test_from_slice_requires_seven() {
        assert!(PublicInputs::from_slice(&[U256::ZERO; 6]).is_none());
        assert!(PublicInputs::from_slice(&[U256::ZERO; 8]).is_none());
        assert!(PublicInputs::from_slice(&[U256::ZERO; 7]).is_some());
    }
}
