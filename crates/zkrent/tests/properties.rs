//! Property tests for replay protection and the lease lifecycle

use proptest::prelude::*;
use std::sync::Arc;
use zkrent::{Deployment, Environment};
use zkrent_common::{
    Attestation, AttestorKey, Error, EventLog, Identity, ManualClock, Nullifier, PolicyId,
    PolicyTerms, PublicInputs, SigningDomain, PASS_ALL, U256,
};
use zkrent_eligibility_gate::{AcceptAllVerifier, MemoryNullifierStore};
use zkrent_lease_escrow::InMemoryLedger;

const NOW: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

struct World {
    deployment: Deployment,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
    attestor: AttestorKey,
    domain: SigningDomain,
    landlord: Identity,
}

fn environment() -> (Environment, Arc<InMemoryLedger>, Arc<ManualClock>) {
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let env = Environment {
        clock: clock.clone(),
        events: Arc::new(EventLog::new()),
        funds: ledger.clone(),
        escrow_account: Identity::from_label("escrow"),
    };
    (env, ledger, clock)
}

fn world() -> World {
    let (env, ledger, clock) = environment();
    let attestor = AttestorKey::from_secret_bytes([42u8; 32]);
    let domain = SigningDomain::new(31337, Identity::from_label("gate"));
    let deployment = Deployment::with_attestation_gate(
        &env,
        Identity::from_label("gate-owner"),
        attestor.identity(),
        domain.clone(),
        Box::new(MemoryNullifierStore::new()),
    )
    .unwrap();
    World {
        deployment,
        ledger,
        clock,
        attestor,
        domain,
        landlord: Identity::from_label("landlord"),
    }
}

fn terms(rent: u64, deadline: u64) -> PolicyTerms {
    PolicyTerms {
        min_age: 18,
        income_multiplier: 3,
        rent_amount: U256::from(rent),
        needs_clean_record: true,
        deadline,
    }
}

impl World {
    fn policy(&self, rent: u64, deadline: u64) -> PolicyId {
        self.deployment
            .registry
            .create_policy(&self.landlord, terms(rent, deadline))
            .unwrap()
    }

    fn attest(&self, caller: &Identity, att: &Attestation) -> zkrent_common::Result<()> {
        let signature = self.attestor.sign(&self.domain, att);
        self.deployment
            .attestation_gate()
            .unwrap()
            .submit_attestation(caller, att, &signature)
    }

    fn eligible_tenant(&self, label: &str, policy_id: PolicyId, funds: u64) -> Identity {
        let tenant = Identity::from_label(label);
        let att = Attestation {
            wallet: tenant,
            policy_id,
            expiry: NOW + DAY,
            nullifier: Nullifier::derive(&tenant, policy_id, &[0u8; 32]),
            pass_bitmask: PASS_ALL,
        };
        self.attest(&tenant, &att).unwrap();
        self.ledger.fund(&tenant, U256::from(funds)).unwrap();
        tenant
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Confirm,
    Refund,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Start), Just(Op::Confirm), Just(Op::Refund)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A valid, unexpired, complete attestation for the caller always grants eligibility
    #[test]
    fn attestation_round_trip(
        label in "[a-z]{1,12}",
        seed in any::<[u8; 32]>(),
        policy in 1u64..1_000,
        ttl in 0u64..(365 * DAY),
    ) {
        let w = world();
        let wallet = Identity::from_label(&label);
        let att = Attestation {
            wallet,
            policy_id: PolicyId::new(policy),
            expiry: NOW + ttl,
            nullifier: Nullifier::new(seed),
            pass_bitmask: PASS_ALL,
        };
        w.attest(&wallet, &att).unwrap();
        prop_assert!(w.deployment.oracle().is_eligible(PolicyId::new(policy), &wallet));
    }

    /// A consumed nullifier is rejected whoever presents it and for whatever policy
    #[test]
    fn attestation_nullifier_single_use(
        seed in any::<[u8; 32]>(),
        first in "[a-z]{1,8}",
        second in "[a-z]{1,8}",
        p1 in 1u64..100,
        p2 in 1u64..100,
    ) {
        let w = world();
        let a = Identity::from_label(&first);
        let b = Identity::from_label(&second);
        let att = |wallet, policy| Attestation {
            wallet,
            policy_id: PolicyId::new(policy),
            expiry: NOW + DAY,
            nullifier: Nullifier::new(seed),
            pass_bitmask: PASS_ALL,
        };

        w.attest(&a, &att(a, p1)).unwrap();
        prop_assert_eq!(w.attest(&b, &att(b, p2)).unwrap_err(), Error::NullifierReused);
        prop_assert_eq!(w.attest(&a, &att(a, p1)).unwrap_err(), Error::NullifierReused);
    }

    #[test]
    fn proof_nullifier_single_use(seed in any::<[u8; 32]>(), callers in 2usize..5) {
        let (env, _ledger, _clock) = environment();
        let deployment = Deployment::with_proof_gate(
            &env,
            Arc::new(AcceptAllVerifier),
            Box::new(MemoryNullifierStore::new()),
        );
        let landlord = Identity::from_label("landlord");
        let policy_id = deployment
            .registry
            .create_policy(&landlord, terms(1_000, NOW + DAY))
            .unwrap();
        let policy = deployment.registry.get_policy(policy_id).unwrap();
        let inputs = PublicInputs::for_policy(&policy, &Nullifier::new(seed));
        let gate = deployment.proof_gate().unwrap();

        let first = Identity::from_label("caller-0");
        gate.submit_proof(&first, policy_id, b"p", inputs.as_slice()).unwrap();
        for i in 1..callers {
            let caller = Identity::from_label(&format!("caller-{i}"));
            prop_assert_eq!(
                gate.submit_proof(&caller, policy_id, b"p", inputs.as_slice()).unwrap_err(),
                Error::NullifierReused
            );
            prop_assert!(!gate.is_eligible(policy_id, &caller));
        }
    }

    /// At most one active lease per key; the escrow balance always equals the
    /// active deposit
    #[test]
    fn lease_lifecycle_matches_model(ops in proptest::collection::vec(op(), 1..24)) {
        let w = world();
        let rent = 250u64;
        let deadline = NOW + 10 * DAY;
        let policy_id = w.policy(rent, deadline);
        let tenant = w.eligible_tenant("tenant", policy_id, rent * ops.len() as u64);
        let escrow = &w.deployment.escrow;

        // the first refund attempt moves the clock past the deadline
        let mut active = false;
        let mut expired = false;
        for op in ops {
            match op {
                Op::Start => {
                    let res = escrow.start_lease(&tenant, policy_id, U256::from(rent));
                    if expired {
                        prop_assert_eq!(res.unwrap_err(), Error::DeadlinePassed);
                    } else if active {
                        prop_assert_eq!(res.unwrap_err(), Error::LeaseExists);
                    } else {
                        prop_assert!(res.is_ok());
                        active = true;
                    }
                }
                Op::Confirm => {
                    let res = escrow.owner_confirm(&w.landlord, policy_id, &tenant);
                    if active {
                        prop_assert!(res.is_ok());
                        active = false;
                    } else {
                        prop_assert_eq!(res.unwrap_err(), Error::LeaseNotActive);
                    }
                }
                Op::Refund => {
                    if !expired {
                        w.clock.set(deadline + 1);
                        expired = true;
                    }
                    let res = escrow.timeout_refund(&tenant, policy_id);
                    if active {
                        prop_assert!(res.is_ok());
                        active = false;
                    } else {
                        prop_assert_eq!(res.unwrap_err(), Error::LeaseNotActive);
                    }
                }
            }
            prop_assert_eq!(escrow.is_active(policy_id, &tenant), active);
            let held = if active { U256::from(rent) } else { U256::ZERO };
            prop_assert_eq!(w.ledger.balance_of(&escrow.escrow_account()), held);
        }
    }

    /// Refund is refused at exactly the deadline and allowed one second later
    #[test]
    fn refund_boundary(days in 1u64..365, rent in 1u64..1_000_000_000) {
        let w = world();
        let deadline = NOW + days * DAY;
        let policy_id = w.policy(rent, deadline);
        let tenant = w.eligible_tenant("tenant", policy_id, rent);
        let escrow = &w.deployment.escrow;
        escrow.start_lease(&tenant, policy_id, U256::from(rent)).unwrap();

        w.clock.set(deadline);
        prop_assert_eq!(
            escrow.timeout_refund(&tenant, policy_id).unwrap_err(),
            Error::DeadlineNotReached
        );
        w.clock.set(deadline + 1);
        prop_assert!(escrow.timeout_refund(&tenant, policy_id).is_ok());
        prop_assert_eq!(w.ledger.balance_of(&tenant), U256::from(rent));
    }
}
