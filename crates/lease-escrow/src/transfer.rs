//! Native value movement
//!
//! The escrow never touches balances directly; it asks a `ValueTransfer`
//! to move funds and treats the recipient as untrusted. A transfer may fail
//! (recipient refuses, insufficient funds) and may re-enter the escrow.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;
use zkrent_common::{Identity, U256};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds: {account} holds {available}, needs {required}")]
    InsufficientFunds {
        account: Identity,
        available: U256,
        required: U256,
    },

    #[error("recipient {0} rejected the transfer")]
    Rejected(Identity),

    #[error("balance overflow for {0}")]
    Overflow(Identity),
}

pub trait ValueTransfer: Send + Sync {
    fn transfer(&self, from: &Identity, to: &Identity, amount: U256) -> Result<(), TransferError>;
}

/// Balances kept in memory. Recipients can be flagged to refuse incoming
/// value, which is how a hostile or broken receiver is simulated.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<Identity, U256>>,
    rejecting: Mutex<HashSet<Identity>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account` out of thin air
    pub fn fund(&self, account: &Identity, amount: U256) -> Result<(), TransferError> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(*account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow(*account))?;
        Ok(())
    }

    pub fn balance_of(&self, account: &Identity) -> U256 {
        self.balances
            .lock()
            .get(account)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Make `account` refuse (or accept again) incoming transfers
    pub fn set_rejecting(&self, account: &Identity, reject: bool) {
        let mut rejecting = self.rejecting.lock();
        if reject {
            rejecting.insert(*account);
        } else {
            rejecting.remove(account);
        }
    }
}

impl ValueTransfer for InMemoryLedger {
    fn transfer(&self, from: &Identity, to: &Identity, amount: U256) -> Result<(), TransferError> {
        if self.rejecting.lock().contains(to) {
            debug!(to = %to, "Recipient rejected transfer");
            return Err(TransferError::Rejected(*to));
        }

        let mut balances = self.balances.lock();
        let available = balances.get(from).copied().unwrap_or(U256::ZERO);
        let debited = available
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientFunds {
                account: *from,
                available,
                required: amount,
            })?;

        if from == to {
            return Ok(());
        }

        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(U256::ZERO)
            .checked_add(amount)
            .ok_or(TransferError::Overflow(*to))?;

        balances.insert(*from, debited);
        balances.insert(*to, credited);
        Ok(())
    }
}
