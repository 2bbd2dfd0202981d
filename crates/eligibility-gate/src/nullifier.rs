//! Nullifier registries that prevent proof and attestation replay
//!
//! A store is a write-once set: once `consume` returns `true` for a
//! nullifier, every later `is_used` returns `true` and every later
//! `consume` returns `false`. The eligibility a nullifier granted is kept
//! in the same store and written together with it, so a gate rebuilt on
//! the same store sees both. Nothing ever removes an entry, so the store
//! grows for its lifetime.

use redis::Commands;
use std::collections::HashSet;
use zkrent_common::{Error, Identity, Nullifier, PolicyId, Result};

pub trait NullifierStore: Send {
    fn is_used(&self, nullifier: &Nullifier) -> Result<bool>;

    /// Atomically mark `nullifier` used and record `who` eligible for
    /// `policy_id`. Either both writes happen or neither does.
    ///
    /// # Returns
    /// * `Ok(true)` - Nullifier was new; it is now used and `who` is eligible
    /// * `Ok(false)` - Nullifier was already used; nothing was written
    fn consume(
        &mut self,
        nullifier: &Nullifier,
        policy_id: PolicyId,
        who: &Identity,
    ) -> Result<bool>;

    fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> Result<bool>;
}

/// Process-local nullifier set
#[derive(Debug, Default)]
pub struct MemoryNullifierStore {
    used: HashSet<Nullifier>,
    eligible: HashSet<(PolicyId, Identity)>,
}

impl MemoryNullifierStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

impl NullifierStore for MemoryNullifierStore {
    fn is_used(&self, nullifier: &Nullifier) -> Result<bool> {
        Ok(self.used.contains(nullifier))
    }

    fn consume(
        &mut self,
        nullifier: &Nullifier,
        policy_id: PolicyId,
        who: &Identity,
    ) -> Result<bool> {
        if !self.used.insert(*nullifier) {
            return Ok(false);
        }
        self.eligible.insert((policy_id, *who));
        Ok(true)
    }

    fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> Result<bool> {
        Ok(self.eligible.contains(&(policy_id, *who)))
    }
}

// KEYS[1] = nullifier key, KEYS[2] = eligibility key
const CONSUME_SCRIPT: &str = r"
if redis.call('SET', KEYS[1], '1', 'NX') then
    redis.call('SET', KEYS[2], '1')
    return 1
end
return 0
";

/// Nullifier set persisted in Redis, shared by every process pointing at
/// the same database. Keys are `{namespace}:nullifier:{hex}` and
/// `{namespace}:eligible:{policy}:{identity}`; none expire.
pub struct RedisNullifierStore {
    redis_client: redis::Client,
    namespace: String,
    consume_script: redis::Script,
}

impl RedisNullifierStore {
    /// Create a new Redis-backed store
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `namespace` - Key prefix separating one gate's set from another's
    pub fn new(redis_url: &str, namespace: &str) -> Result<Self> {
        let redis_client =
            redis::Client::open(redis_url).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(Self {
            redis_client,
            namespace: namespace.to_string(),
            consume_script: redis::Script::new(CONSUME_SCRIPT),
        })
    }

    fn nullifier_key(&self, nullifier: &Nullifier) -> String {
        format!("{}:nullifier:{}", self.namespace, nullifier.to_hex())
    }

    fn eligibility_key(&self, policy_id: PolicyId, who: &Identity) -> String {
        format!("{}:eligible:{}:{}", self.namespace, policy_id, who.to_hex())
    }

    fn connection(&self) -> Result<redis::Connection> {
        self.redis_client
            .get_connection()
            .map_err(|e| Error::Storage(e.to_string()))
    }
}

impl NullifierStore for RedisNullifierStore {
    fn is_used(&self, nullifier: &Nullifier) -> Result<bool> {
        let mut conn = self.connection()?;
        conn.exists(self.nullifier_key(nullifier))
            .map_err(|e| Error::Storage(e.to_string()))
    }

    fn consume(
        &mut self,
        nullifier: &Nullifier,
        policy_id: PolicyId,
        who: &Identity,
    ) -> Result<bool> {
        let mut conn = self.connection()?;
        // SET NX on the nullifier and the eligibility write run as one script
        self.consume_script
            .key(self.nullifier_key(nullifier))
            .key(self.eligibility_key(policy_id, who))
            .invoke::<bool>(&mut conn)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    fn is_eligible(&self, policy_id: PolicyId, who: &Identity) -> Result<bool> {
        let mut conn = self.connection()?;
        conn.exists(self.eligibility_key(policy_id, who))
            .map_err(|e| Error::Storage(e.to_string()))
    }
}
