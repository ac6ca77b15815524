//! evidence-verify: verify ledger tasks against their stored evidence

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use task_evidence::{
    AccountDirectory, ContentLocator, GatewayFetcher, KeyMaterial, NearRpcLedger, SignerIdentity,
    TaskVerifier, VerificationOutcome, VerifierConfig, VisionDescriber,
};

#[derive(Parser)]
#[command(name = "evidence-verify", version, about = "Verify task evidence recorded on the ledger")]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, env = "EVIDENCE_VERIFY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify a task by id
    Verify {
        task_id: u64,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve an evidence reference to its gateway URL
    Locate { evidence: String },

    /// Show the signer account and the evidence encryption public key
    PublicKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Verify { task_id, json } => verify(config, task_id, json).await,
        Command::Locate { evidence } => {
            let resolved = ContentLocator::from_config(&config.gateway).resolve(&evidence)?;
            println!("{}", resolved.url);
            Ok(())
        }
        Command::PublicKey => public_key(&config).await,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<VerifierConfig> {
    let config = match path {
        Some(path) => VerifierConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => VerifierConfig::default(),
    };
    Ok(config.with_env())
}

async fn resolve_identity(config: &VerifierConfig) -> Option<SignerIdentity> {
    let identity = match SignerIdentity::from_config(config.signer_private_key.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Signer identity unavailable: {}", e);
            return None;
        }
    };

    let directory = match AccountDirectory::new(&config.ledger) {
        Ok(directory) => directory,
        Err(e) => {
            warn!("Account directory unavailable: {}", e);
            return Some(identity);
        }
    };

    match directory.resolve(identity.clone()).await {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            warn!("Failed to resolve signer account: {}", e);
            Some(identity)
        }
    }
}

async fn verify(config: VerifierConfig, task_id: u64, json: bool) -> Result<()> {
    if let Some(identity) = resolve_identity(&config).await {
        info!(
            "Signer {} (account: {})",
            identity.prefixed_public_key(),
            identity.account_id.as_deref().unwrap_or("unknown")
        );
    }

    let ledger = NearRpcLedger::new(&config.ledger)?;
    let fetcher = GatewayFetcher::from_config(&config.gateway)?;
    let describer = VisionDescriber::new(config.describer.clone())?;
    info!(
        "Reading tasks from {} via {}",
        ledger.contract_id(),
        config.ledger.rpc_url
    );

    let verifier = TaskVerifier::new(
        &config,
        Arc::new(ledger),
        Arc::new(fetcher),
        Arc::new(describer),
    );

    let outcome = verifier.verify(task_id).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    } else {
        println!("{}", outcome);
    }

    if let VerificationOutcome::Failed { .. } = outcome {
        std::process::exit(1);
    }
    Ok(())
}

fn outcome_json(outcome: &VerificationOutcome) -> serde_json::Value {
    match outcome {
        VerificationOutcome::NotFound { task_id } => serde_json::json!({
            "task_id": task_id,
            "status": "not_found",
        }),
        VerificationOutcome::AlreadyVerified { task_id, result } => serde_json::json!({
            "task_id": task_id,
            "status": "already_verified",
            "result": result,
        }),
        VerificationOutcome::Verified {
            task_id,
            evidence_url,
            description,
        } => serde_json::json!({
            "task_id": task_id,
            "status": "verified",
            "evidence_url": evidence_url,
            "description": description,
        }),
        VerificationOutcome::Failed {
            task_id,
            stage,
            error,
        } => serde_json::json!({
            "task_id": task_id,
            "status": "failed",
            "stage": stage.to_string(),
            "kind": format!("{:?}", error.kind()),
            "error": error.to_string(),
        }),
    }
}

async fn public_key(config: &VerifierConfig) -> Result<()> {
    let identity = resolve_identity(config)
        .await
        .context("SIGNER_PRIVATE_KEY is not configured or invalid")?;
    println!("signer:     {}", identity.prefixed_public_key());
    println!(
        "account:    {}",
        identity.account_id.as_deref().unwrap_or("unknown")
    );

    match KeyMaterial::from_config(config.encryption_key.as_deref()) {
        Ok(key) => println!("encryption: {}", STANDARD.encode(key.public_key().as_bytes())),
        Err(e) => warn!("Encryption key unavailable: {}", e),
    }
    Ok(())
}
