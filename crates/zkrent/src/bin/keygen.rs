//! Attestor key and attestation utility
//!
//! Commands:
//! - generate: Create a new attestor signing key and its public identity
//! - domain: Print the domain separator a gate will verify against
//! - sign: Sign an attestation the way the issuing service does

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use zkrent::config::{DEFAULT_CHAIN_CONTEXT, DEFAULT_GATE_LABEL};
use zkrent_common::{
    Attestation, AttestorKey, Clock, Identity, Nullifier, PolicyId, SigningDomain, SystemClock,
    PASS_ALL,
};

#[derive(Parser)]
#[command(name = "zkrent-keygen")]
#[command(about = "Attestor key generation and attestation signing utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DomainArgs {
    /// Chain context bound into the signature
    #[arg(long, default_value_t = DEFAULT_CHAIN_CONTEXT)]
    chain_context: u64,

    /// Gate address (hex, 32 bytes); defaults to the standard gate address
    #[arg(long)]
    gate_address: Option<String>,
}

impl DomainArgs {
    fn domain(&self) -> Result<SigningDomain> {
        let gate_address = match &self.gate_address {
            Some(hex) => Identity::from_hex(hex).context("Invalid gate address")?,
            None => Identity::from_label(DEFAULT_GATE_LABEL),
        };
        Ok(SigningDomain::new(self.chain_context, gate_address))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new attestor signing key
    Generate,

    /// Show the domain separator for a gate
    Domain {
        #[command(flatten)]
        domain: DomainArgs,
    },

    /// Sign an attestation and print it as JSON
    Sign {
        /// Attestor secret key (hex, 32 bytes)
        #[arg(short, long)]
        secret: String,

        /// Tenant identity the attestation is issued to (hex, 32 bytes)
        #[arg(short, long)]
        wallet: String,

        /// Policy the tenant was checked against
        #[arg(short, long)]
        policy_id: u64,

        /// Seconds the attestation stays valid
        #[arg(long, default_value_t = 3600)]
        ttl: u64,

        /// Nullifier (hex, 32 bytes); derived from a random salt when omitted
        #[arg(long)]
        nullifier: Option<String>,

        /// Pass bitmask (bit 0 age, bit 1 income, bit 2 clean record)
        #[arg(long, default_value_t = PASS_ALL)]
        pass_bitmask: u8,

        #[command(flatten)]
        domain: DomainArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate => generate_key(),
        Commands::Domain { domain } => show_domain(&domain)?,
        Commands::Sign {
            secret,
            wallet,
            policy_id,
            ttl,
            nullifier,
            pass_bitmask,
            domain,
        } => sign(
            &secret,
            &wallet,
            PolicyId::new(policy_id),
            ttl,
            nullifier.as_deref(),
            pass_bitmask,
            &domain,
        )?,
    }

    Ok(())
}

fn generate_key() {
    println!("=== zkrent Attestor Key Generator ===\n");

    let key = AttestorKey::generate();

    println!("SECRET KEY (keep secret!):");
    println!("  {}", key.to_secret_hex());
    println!();

    println!("ATTESTOR IDENTITY (public key):");
    println!("  {}", key.identity().to_hex());
    println!();

    println!("=== Copy to .env file ===");
    println!("ATTESTOR_PUBLIC_KEY={}", key.identity().to_hex());
}

fn show_domain(args: &DomainArgs) -> Result<()> {
    let domain = args.domain()?;

    println!("name:             {}", domain.name);
    println!("version:          {}", domain.version);
    println!("chain context:    {}", domain.chain_context);
    println!("gate address:     {}", domain.gate_address);
    println!("domain separator: 0x{}", hex::encode(domain.separator()));

    Ok(())
}

fn sign(
    secret: &str,
    wallet: &str,
    policy_id: PolicyId,
    ttl: u64,
    nullifier: Option<&str>,
    pass_bitmask: u8,
    domain: &DomainArgs,
) -> Result<()> {
    let key = AttestorKey::from_secret_hex(secret).context("Invalid attestor secret key")?;
    let wallet = Identity::from_hex(wallet).context("Invalid wallet identity")?;
    let domain = domain.domain()?;

    let nullifier = match nullifier {
        Some(hex) => {
            Nullifier::from_hex(hex.trim_start_matches("0x")).context("Invalid nullifier")?
        }
        None => {
            let mut salt = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut salt);
            Nullifier::derive(&wallet, policy_id, &salt)
        }
    };

    let now = SystemClock.now();
    let attestation = Attestation {
        wallet,
        policy_id,
        expiry: now.saturating_add(ttl),
        nullifier,
        pass_bitmask,
    };
    tracing::info!(
        attestor = %key.identity(),
        wallet = %wallet,
        %policy_id,
        "Signing attestation, nullifier {}",
        nullifier
    );

    let signed = key.issue(&domain, attestation);
    println!("{}", serde_json::to_string_pretty(&signed)?);

    Ok(())
}
