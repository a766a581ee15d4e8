//! Prediction Market Oracle
//!
//! Resolves a market question with a reasoning model and signs the outcome
//! as an EIP-712 settlement proposal.

mod commands;
mod config;

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::{ResolveArgs, VerifyArgs};
use crate::config::OracleConfig;

#[derive(Parser, Debug)]
#[command(name = "oracle-cli", version, about = "Resolve prediction markets and sign settlement proposals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Research a market question, decide its outcome and sign a proposal
    Resolve {
        /// JSON file holding the market question
        question: PathBuf,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip signing even when a key is configured
        #[arg(long)]
        no_sign: bool,
    },
    /// Check an attestation or resolution report offline
    Verify {
        path: PathBuf,
        /// Signer the attestation must recover to
        #[arg(long)]
        signer: Option<Address>,
    },
    /// Print the tool definitions offered to the reasoning model
    Tools {
        /// Include hosted tools such as web search
        #[arg(long)]
        hosted: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,oracle_cli=debug")))
        .init();

    let cli = Cli::parse();
    let config = OracleConfig::from_env()?;
    debug!("Loaded {:?}", config);

    match cli.command {
        Command::Resolve { question, output, no_sign } => {
            let sign = !no_sign && config.can_sign();
            if !no_sign && !sign {
                info!("ORACLE_PRIVATE_KEY or ORACLE_VERIFYING_CONTRACT not set, report will be unsigned");
            }
            commands::resolve(&config, ResolveArgs { question, output, sign }).await
        }
        Command::Verify { path, signer } => {
            commands::verify(VerifyArgs {
                path,
                expected_signer: signer,
            })
            .await
        }
        Command::Tools { hosted } => commands::list_tools(&config, hosted).await,
    }
}
