//! Configuration management for a zkrent deployment
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::fmt;
use std::str::FromStr;
use zkrent_common::Identity;

pub const DEFAULT_CHAIN_CONTEXT: u64 = 31337;

/// Label hashed into the default gate address
pub const DEFAULT_GATE_LABEL: &str = "zkrent/attestation-gate";

/// Label hashed into the default escrow account
pub const DEFAULT_ESCROW_LABEL: &str = "zkrent/lease-escrow";

/// Which eligibility gate the escrow consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMode {
    #[default]
    Attestation,
    Proof,
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attestation => write!(f, "attestation"),
            Self::Proof => write!(f, "proof"),
        }
    }
}

impl FromStr for GateMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attestation" => Ok(Self::Attestation),
            "proof" => Ok(Self::Proof),
            other => anyhow::bail!(
                "unknown gate mode '{}', expected 'attestation' or 'proof'",
                other
            ),
        }
    }
}

/// Deployment configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gate_mode: GateMode,

    /// Trusted attestor (ed25519 verifying key); required in attestation mode
    pub attestor: Option<Identity>,

    /// Gate owner, allowed to rotate the attestor. Defaults to the attestor.
    pub gate_owner: Option<Identity>,

    /// Chain context bound into every attestation signature
    pub chain_context: u64,

    /// Address of this gate instance, bound into every attestation signature
    pub gate_address: Identity,

    /// Account that holds escrowed funds
    pub escrow_account: Identity,

    /// Redis URL for nullifier storage; in-memory when unset
    pub redis_url: Option<String>,

    /// Expected RISC Zero image id for proof verification
    pub image_id: Option<[u8; 32]>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gate_mode: GateMode::default(),
            attestor: None,
            gate_owner: None,
            chain_context: DEFAULT_CHAIN_CONTEXT,
            gate_address: Identity::from_label(DEFAULT_GATE_LABEL),
            escrow_account: Identity::from_label(DEFAULT_ESCROW_LABEL),
            redis_url: None,
            image_id: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenv::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Config {
            gate_mode: var("GATE_MODE")
                .map(|v| v.parse::<GateMode>())
                .transpose()
                .context("Invalid GATE_MODE")?
                .unwrap_or(defaults.gate_mode),

            attestor: var("ATTESTOR_PUBLIC_KEY")
                .map(|v| parse_identity(&v))
                .transpose()
                .context("Invalid ATTESTOR_PUBLIC_KEY")?,

            gate_owner: var("GATE_OWNER")
                .map(|v| parse_identity(&v))
                .transpose()
                .context("Invalid GATE_OWNER")?,

            chain_context: var("CHAIN_CONTEXT")
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .context("Invalid CHAIN_CONTEXT")?
                .unwrap_or(defaults.chain_context),

            gate_address: var("GATE_ADDRESS")
                .map(|v| parse_identity(&v))
                .transpose()
                .context("Invalid GATE_ADDRESS")?
                .unwrap_or(defaults.gate_address),

            escrow_account: var("ESCROW_ACCOUNT")
                .map(|v| parse_identity(&v))
                .transpose()
                .context("Invalid ESCROW_ACCOUNT")?
                .unwrap_or(defaults.escrow_account),

            redis_url: var("REDIS_URL"),

            image_id: var("IMAGE_ID")
                .map(|v| parse_identity(&v).map(|id| id.0))
                .transpose()
                .context("Invalid IMAGE_ID")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.gate_mode {
            GateMode::Attestation => {
                match self.attestor {
                    None => anyhow::bail!("ATTESTOR_PUBLIC_KEY is required in attestation mode"),
                    Some(attestor) if attestor.is_zero() => {
                        anyhow::bail!("ATTESTOR_PUBLIC_KEY must be non-zero")
                    }
                    Some(_) => {}
                }
                if self.gate_owner.is_some_and(|owner| owner.is_zero()) {
                    anyhow::bail!("GATE_OWNER must be non-zero");
                }
            }
            GateMode::Proof => {
                if self.image_id.is_none() {
                    anyhow::bail!("IMAGE_ID is required in proof mode");
                }
            }
        }

        if self.gate_address.is_zero() {
            anyhow::bail!("GATE_ADDRESS must be non-zero");
        }
        if self.escrow_account.is_zero() {
            anyhow::bail!("ESCROW_ACCOUNT must be non-zero");
        }

        Ok(())
    }

    /// The gate owner, falling back to the attestor
    pub fn owner(&self) -> Option<Identity> {
        self.gate_owner.or(self.attestor)
    }

    /// Namespace for persisted nullifiers; distinct per gate instance
    pub fn nullifier_namespace(&self) -> String {
        format!("zkrent:{}:{}", self.gate_mode, self.gate_address.to_hex())
    }
}

fn parse_identity(value: &str) -> Result<Identity> {
    Identity::from_hex(value).map_err(|e| anyhow::anyhow!("expected 32-byte hex value: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn attestor_hex() -> String {
        Identity::from_label("attestor").to_hex()
    }

    #[test]
    fn test_config_defaults() {
        let attestor = attestor_hex();
        let config =
            load(&[("ATTESTOR_PUBLIC_KEY", attestor.as_str())]).expect("Failed to load config");

        assert_eq!(config.gate_mode, GateMode::Attestation);
        assert_eq!(config.chain_context, 31337);
        assert_eq!(config.gate_address, Identity::from_label(DEFAULT_GATE_LABEL));
        assert_eq!(config.escrow_account, Identity::from_label(DEFAULT_ESCROW_LABEL));
        assert!(config.redis_url.is_none());
        // owner falls back to the attestor
        assert_eq!(config.owner(), Some(Identity::from_label("attestor")));
    }

    #[test]
    fn test_attestation_mode_requires_attestor() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("ATTESTOR_PUBLIC_KEY"));
    }

    #[test]
    fn test_proof_mode_requires_image_id() {
        assert!(load(&[("GATE_MODE", "proof")]).is_err());

        let image_id = hex::encode([7u8; 32]);
        let config = load(&[("GATE_MODE", "Proof"), ("IMAGE_ID", image_id.as_str())]).unwrap();
        assert_eq!(config.gate_mode, GateMode::Proof);
        assert_eq!(config.image_id, Some([7u8; 32]));
    }

    #[test]
    fn test_zero_gate_address_rejected() {
        let attestor = attestor_hex();
        let zero = "00".repeat(32);
        let err = load(&[
            ("ATTESTOR_PUBLIC_KEY", attestor.as_str()),
            ("GATE_ADDRESS", zero.as_str()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("GATE_ADDRESS"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let attestor = attestor_hex();
        assert!(load(&[("GATE_MODE", "vault")]).is_err());
        assert!(load(&[
            ("ATTESTOR_PUBLIC_KEY", attestor.as_str()),
            ("CHAIN_CONTEXT", "mainnet"),
        ])
        .is_err());
        assert!(load(&[("ATTESTOR_PUBLIC_KEY", "0xabcd")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let owner = Identity::from_label("owner");
        let attestor = format!("0x{}", attestor_hex());
        let owner_hex = owner.to_hex();
        let config = load(&[
            ("ATTESTOR_PUBLIC_KEY", attestor.as_str()),
            ("GATE_OWNER", owner_hex.as_str()),
            ("CHAIN_CONTEXT", "11155111"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();

        assert_eq!(config.owner(), Some(owner));
        assert_eq!(config.chain_context, 11155111);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_nullifier_namespace_is_per_gate() {
        let a = Config::default();
        let b = Config {
            gate_address: Identity::from_label("other-gate"),
            ..Config::default()
        };
        let c = Config {
            gate_mode: GateMode::Proof,
            ..Config::default()
        };
        assert_ne!(a.nullifier_namespace(), b.nullifier_namespace());
        assert_ne!(a.nullifier_namespace(), c.nullifier_namespace());
    }
}
