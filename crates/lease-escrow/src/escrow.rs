//! Lease escrow state machine
//!
//! Per `(policy, tenant)` key: `NoLease -> Active -> {Released | Refunded}`.
//! A resolved key may be opened again; the new lease replaces the record.
//!
//! Each key has its own reentrant lock, held for the whole operation
//! including the outgoing transfer. The record is mutated before value
//! moves, so a transfer that calls back into the escrow for the same key
//! sees the lease already resolved. If the transfer fails the record is
//! put back as it was before the call.
//!
//! Rollback covers only the key the failing operation holds. A transfer
//! that calls back into the escrow for a different key runs that nested
//! operation to completion under its own lock; if the outer transfer then
//! fails, the nested change and the value it moved stay in place.

use crate::lease::{Lease, LeaseKey};
use crate::transfer::ValueTransfer;
use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, error, info};
use zkrent_common::{
    Clock, EligibilityOracle, Error, Event, EventSink, Identity, PolicyId, Result, U256,
};
use zkrent_policy_registry::PolicyRegistry;

type LeaseSlot = ReentrantMutex<RefCell<Option<Lease>>>;

pub struct LeaseEscrow {
    registry: Arc<PolicyRegistry>,
    oracle: Arc<dyn EligibilityOracle>,
    funds: Arc<dyn ValueTransfer>,
    /// Account holding deposited value
    account: Identity,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    leases: DashMap<LeaseKey, Arc<LeaseSlot>>,
}

impl LeaseEscrow {
    pub fn new(
        registry: Arc<PolicyRegistry>,
        oracle: Arc<dyn EligibilityOracle>,
        funds: Arc<dyn ValueTransfer>,
        account: Identity,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            oracle,
            funds,
            account,
            clock,
            events,
            leases: DashMap::new(),
        }
    }

    pub fn escrow_account(&self) -> Identity {
        self.account
    }

    /// Deposit `payment` from `caller` and open a lease under `policy_id`.
    ///
    /// The payment is pulled from the caller into the escrow account; a
    /// failed pull leaves no lease behind.
    pub fn start_lease(&self, caller: &Identity, policy_id: PolicyId, payment: U256) -> Result<()> {
        if !self.oracle.is_eligible(policy_id, caller) {
            debug!(%policy_id, caller = %caller, "Caller not eligible");
            return Err(Error::NotEligible);
        }

        let policy = self.registry.get_policy(policy_id)?;
        let now = self.clock.now();
        if policy.is_expired(now) {
            debug!(%policy_id, deadline = policy.deadline, now, "Policy deadline passed");
            return Err(Error::DeadlinePassed);
        }

        if payment != policy.rent_amount {
            return Err(Error::WrongAmount {
                expected: policy.rent_amount,
                actual: payment,
            });
        }

        let slot = self.slot((policy_id, *caller));
        let guard = slot.lock();

        let previous = {
            let mut record = guard.borrow_mut();
            if record.as_ref().is_some_and(Lease::is_active) {
                debug!(%policy_id, tenant = %caller, "Lease already active");
                return Err(Error::LeaseExists);
            }
            record.replace(Lease {
                tenant: *caller,
                amount: payment,
                deadline: policy.deadline,
                active: true,
            })
        };

        if let Err(e) = self.funds.transfer(caller, &self.account, payment) {
            error!(%policy_id, tenant = %caller, "Deposit transfer failed: {}", e);
            *guard.borrow_mut() = previous;
            return Err(Error::TransferFailed(e.to_string()));
        }
        drop(guard);

        info!(%policy_id, tenant = %caller, amount = %payment, "Lease started");
        self.events.emit(Event::LeaseStarted {
            policy_id,
            tenant: *caller,
            amount: payment,
            deadline: policy.deadline,
        });
        Ok(())
    }

    /// Release the tenant's deposit to the policy owner
    pub fn owner_confirm(
        &self,
        caller: &Identity,
        policy_id: PolicyId,
        tenant: &Identity,
    ) -> Result<()> {
        let policy = self.registry.get_policy(policy_id)?;
        if *caller != policy.owner {
            debug!(%policy_id, caller = %caller, "Caller is not the policy owner");
            return Err(Error::NotOwner);
        }

        let amount = self.settle((policy_id, *tenant), &policy.owner, |_| Ok(()))?;

        info!(%policy_id, tenant = %tenant, amount = %amount, "Lease released to owner");
        self.events.emit(Event::LeaseReleased {
            policy_id,
            tenant: *tenant,
            amount,
        });
        Ok(())
    }

    /// Return the caller's deposit once the lease deadline has passed
    pub fn timeout_refund(&self, caller: &Identity, policy_id: PolicyId) -> Result<()> {
        let now = self.clock.now();
        let amount = self.settle((policy_id, *caller), caller, |lease| {
            if lease.is_refundable(now) {
                Ok(())
            } else {
                debug!(%policy_id, deadline = lease.deadline, now, "Refund requested too early");
                Err(Error::DeadlineNotReached)
            }
        })?;

        info!(%policy_id, tenant = %caller, amount = %amount, "Lease refunded");
        self.events.emit(Event::LeaseRefunded {
            policy_id,
            tenant: *caller,
            amount,
        });
        Ok(())
    }

    /// Copy of the current record for `(policy_id, tenant)`, active or not
    pub fn get_lease(&self, policy_id: PolicyId, tenant: &Identity) -> Option<Lease> {
        let slot = self.leases.get(&(policy_id, *tenant)).map(|s| Arc::clone(&s))?;
        let guard = slot.lock();
        let lease = guard.borrow().clone();
        lease
    }

    pub fn is_active(&self, policy_id: PolicyId, tenant: &Identity) -> bool {
        self.get_lease(policy_id, tenant)
            .is_some_and(|lease| lease.active)
    }

    /// Deactivate the active lease at `key` and pay its amount to `to`.
    ///
    /// `check` runs against the active record before anything changes.
    fn settle<F>(&self, key: LeaseKey, to: &Identity, check: F) -> Result<U256>
    where
        F: FnOnce(&Lease) -> Result<()>,
    {
        let Some(slot) = self.leases.get(&key).map(|s| Arc::clone(&s)) else {
            return Err(Error::LeaseNotActive);
        };
        let guard = slot.lock();

        let (snapshot, amount) = {
            let mut record = guard.borrow_mut();
            let lease = match record.as_mut() {
                Some(lease) if lease.active => lease,
                _ => return Err(Error::LeaseNotActive),
            };
            check(lease)?;
            let snapshot = lease.clone();
            lease.active = false;
            (snapshot, lease.amount)
        };

        if let Err(e) = self.funds.transfer(&self.account, to, amount) {
            error!(policy_id = %key.0, tenant = %key.1, to = %to, "Payout failed: {}", e);
            *guard.borrow_mut() = Some(snapshot);
            return Err(Error::TransferFailed(e.to_string()));
        }
        Ok(amount)
    }

    fn slot(&self, key: LeaseKey) -> Arc<LeaseSlot> {
        let entry = self
            .leases
            .entry(key)
            .or_insert_with(|| Arc::new(ReentrantMutex::new(RefCell::new(None))));
        Arc::clone(&entry)
    }
}
