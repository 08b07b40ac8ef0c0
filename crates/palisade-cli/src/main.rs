//! Palisade CLI
//!
//! Validate policy documents and evaluate requests from the command line.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use palisade::{
    AuthorizationRequest, Authorizer, Effect, PalisadeConfig, Policy, evaluate,
    load_policy_from_file,
};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "palisade")]
#[command(version, about = "Palisade policy authorization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a policy document
    Check {
        /// Policy document (JSON)
        policy: PathBuf,
    },

    /// Evaluate one request against a policy file, without auditing
    Eval {
        /// Policy document (JSON)
        #[arg(short, long)]
        policy: PathBuf,

        /// Authorization request (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Run the full authorize flow using layered configuration
    Authorize {
        /// Authorization request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Correlation id recorded in the audit trail
        #[arg(short, long, default_value = "cli")]
        correlation_id: String,

        /// Directory containing palisade.toml (defaults to the current directory)
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Check { policy } => {
            check_policy(&policy)?;
        }
        Commands::Eval { policy, request } => {
            eval_request(&policy, &request)?;
        }
        Commands::Authorize {
            request,
            correlation_id,
            config_dir,
        } => {
            authorize_request(&request, &correlation_id, config_dir.as_deref())?;
        }
    }

    Ok(())
}

fn load_policy(path: &Path) -> Result<Policy> {
    load_policy_from_file(path).map_err(|e| anyhow::anyhow!("{}: {}", e.kind(), e.hint()))
}

fn read_request(path: &Path) -> Result<AuthorizationRequest> {
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read request from {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("Invalid authorization request in {}", path.display()))
}

fn check_policy(path: &Path) -> Result<()> {
    info!("Checking policy {}...", path.display());

    let policy = load_policy(path)?;
    let denies = policy
        .rules()
        .iter()
        .filter(|rule| rule.effect() == Effect::Deny)
        .count();

    println!("✓ Policy is valid");
    println!("  Id: {}", policy.id());
    println!("  Version: {}", policy.version());
    println!(
        "  Rules: {} ({} allow, {} deny)",
        policy.rules().len(),
        policy.rules().len() - denies,
        denies
    );

    let duplicates = policy.duplicate_rule_ids();
    if !duplicates.is_empty() {
        println!("  ⚠ Duplicate rule ids: {}", duplicates.join(", "));
    }

    Ok(())
}

fn eval_request(policy_path: &Path, request_path: &Path) -> Result<()> {
    let policy = load_policy(policy_path)?;
    let request = read_request(request_path)?;

    let decision = evaluate(&request, &policy);
    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(())
}

fn authorize_request(
    request_path: &Path,
    correlation_id: &str,
    config_dir: Option<&Path>,
) -> Result<()> {
    let config = match config_dir {
        Some(dir) => PalisadeConfig::load_from_dir(dir),
        None => PalisadeConfig::load(),
    }
    .context("Failed to load configuration")?;
    let request = read_request(request_path)?;

    let authorizer = Authorizer::from_config(&config);
    let response = match authorizer.authorize(&request, correlation_id) {
        Ok(response) => response,
        Err(e) => bail!("{}: {}", e.code(), e.hint()),
    };

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
