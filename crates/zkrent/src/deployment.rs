//! Wiring of registry, gate and escrow
//!
//! The escrow only ever sees the configured gate as an
//! `EligibilityOracle`; `Gate` keeps the concrete handle for callers that
//! submit proofs or attestations.

use crate::config::{Config, GateMode};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use zkrent_common::{
    Clock, EligibilityOracle, EventSink, Identity, SigningDomain, SystemClock, TracingEventSink,
};
use zkrent_eligibility_gate::{
    AttestationGate, MemoryNullifierStore, NullifierStore, ProofGate, RedisNullifierStore,
    Verifier,
};
use zkrent_lease_escrow::{LeaseEscrow, ValueTransfer};
use zkrent_policy_registry::PolicyRegistry;

/// The single gate a deployment admits tenants through
#[derive(Clone)]
pub enum Gate {
    Proof(Arc<ProofGate>),
    Attestation(Arc<AttestationGate>),
}

impl Gate {
    pub fn mode(&self) -> GateMode {
        match self {
            Self::Proof(_) => GateMode::Proof,
            Self::Attestation(_) => GateMode::Attestation,
        }
    }

    pub fn oracle(&self) -> Arc<dyn EligibilityOracle> {
        match self {
            Self::Proof(gate) => gate.clone(),
            Self::Attestation(gate) => gate.clone(),
        }
    }
}

pub struct Deployment {
    pub registry: Arc<PolicyRegistry>,
    pub gate: Gate,
    pub escrow: Arc<LeaseEscrow>,
}

/// Shared collaborators every component is built with
#[derive(Clone)]
pub struct Environment {
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
    pub funds: Arc<dyn ValueTransfer>,
    pub escrow_account: Identity,
}

impl Environment {
    /// Wall clock, events written to the tracing log and the escrow
    /// account from `config`
    pub fn system(funds: Arc<dyn ValueTransfer>, config: &Config) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            events: Arc::new(TracingEventSink),
            funds,
            escrow_account: config.escrow_account,
        }
    }
}

impl Deployment {
    /// Registry, attestation gate and escrow
    pub fn with_attestation_gate(
        env: &Environment,
        owner: Identity,
        attestor: Identity,
        domain: SigningDomain,
        nullifiers: Box<dyn NullifierStore>,
    ) -> zkrent_common::Result<Self> {
        let registry = Arc::new(PolicyRegistry::new(env.clock.clone(), env.events.clone()));
        let gate = Arc::new(AttestationGate::new(
            owner,
            attestor,
            domain,
            nullifiers,
            env.clock.clone(),
            env.events.clone(),
        )?);
        Ok(Self::assemble(env, registry, Gate::Attestation(gate)))
    }

    /// Registry, proof gate and escrow
    pub fn with_proof_gate(
        env: &Environment,
        verifier: Arc<dyn Verifier>,
        nullifiers: Box<dyn NullifierStore>,
    ) -> Self {
        let registry = Arc::new(PolicyRegistry::new(env.clock.clone(), env.events.clone()));
        let gate = Arc::new(ProofGate::new(
            registry.clone(),
            verifier,
            nullifiers,
            env.clock.clone(),
            env.events.clone(),
        ));
        Self::assemble(env, registry, Gate::Proof(gate))
    }

    /// Build the deployment `config` describes.
    ///
    /// The escrow account always comes from `config`, whatever `env`
    /// carries. Proof mode needs the `risc0` feature for its production
    /// verifier.
    pub fn from_config(config: &Config, env: &Environment) -> Result<Self> {
        config.validate()?;
        let nullifiers = nullifier_store(config)?;
        let env = &Environment {
            escrow_account: config.escrow_account,
            ..env.clone()
        };

        let deployment = match config.gate_mode {
            GateMode::Attestation => {
                let attestor = config
                    .attestor
                    .context("ATTESTOR_PUBLIC_KEY is required in attestation mode")?;
                let owner = config.owner().unwrap_or(attestor);
                let domain = SigningDomain::new(config.chain_context, config.gate_address);
                info!(
                    attestor = %attestor,
                    owner = %owner,
                    "Attestation gate, domain separator {}",
                    hex::encode(domain.separator())
                );
                Self::with_attestation_gate(env, owner, attestor, domain, nullifiers)
                    .context("Failed to create attestation gate")?
            }
            GateMode::Proof => {
                let verifier = production_verifier(config)?;
                Self::with_proof_gate(env, verifier, nullifiers)
            }
        };

        Ok(deployment)
    }

    pub fn oracle(&self) -> Arc<dyn EligibilityOracle> {
        self.gate.oracle()
    }

    pub fn attestation_gate(&self) -> Option<&Arc<AttestationGate>> {
        match &self.gate {
            Gate::Attestation(gate) => Some(gate),
            Gate::Proof(_) => None,
        }
    }

    pub fn proof_gate(&self) -> Option<&Arc<ProofGate>> {
        match &self.gate {
            Gate::Proof(gate) => Some(gate),
            Gate::Attestation(_) => None,
        }
    }

    fn assemble(env: &Environment, registry: Arc<PolicyRegistry>, gate: Gate) -> Self {
        let escrow = Arc::new(LeaseEscrow::new(
            registry.clone(),
            gate.oracle(),
            env.funds.clone(),
            env.escrow_account,
            env.clock.clone(),
            env.events.clone(),
        ));
        info!(mode = %gate.mode(), escrow = %env.escrow_account, "Deployment assembled");
        Self {
            registry,
            gate,
            escrow,
        }
    }
}

fn nullifier_store(config: &Config) -> Result<Box<dyn NullifierStore>> {
    match &config.redis_url {
        Some(url) => {
            let namespace = config.nullifier_namespace();
            info!("Nullifiers persisted in Redis under {}", namespace);
            let store = RedisNullifierStore::new(url, &namespace)
                .with_context(|| format!("Failed to connect to Redis at {}", url))?;
            Ok(Box::new(store))
        }
        None => {
            info!("Nullifiers kept in memory");
            Ok(Box::new(MemoryNullifierStore::new()))
        }
    }
}

#[cfg(feature = "risc0")]
fn production_verifier(config: &Config) -> Result<Arc<dyn Verifier>> {
    let image_id = config
        .image_id
        .context("IMAGE_ID is required in proof mode")?;
    info!("Proof gate, image id {}", hex::encode(image_id));
    Ok(Arc::new(zkrent_eligibility_gate::Risc0Verifier::new(image_id)))
}

#[cfg(not(feature = "risc0"))]
fn production_verifier(_config: &Config) -> Result<Arc<dyn Verifier>> {
    anyhow::bail!("proof mode requires building with the `risc0` feature")
}
