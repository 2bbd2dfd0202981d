//! zkrent
//!
//! Eligibility-gated lease escrow: a tenant proves it meets a policy's
//! criteria (zero-knowledge proof or signed attestation), deposits rent into
//! escrow, and the deposit goes to the owner on confirmation or back to the
//! tenant after the deadline.

pub mod config;
pub mod deployment;

pub use config::{Config, GateMode};
pub use deployment::{Deployment, Environment, Gate};

pub use zkrent_common as common;
pub use zkrent_eligibility_gate as gate;
pub use zkrent_lease_escrow as escrow;
pub use zkrent_policy_registry as registry;
