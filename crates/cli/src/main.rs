//! KTOMG CLI - operator tools for the ops assistant.
//!
//! # Usage
//!
//! ```bash
//! # List every Vultr instance the assistant can see
//! ktomg-cli instances list
//!
//! # Decode the value of an approval button
//! ktomg-cli token inspect 'runId=...&workflow=restartVmWorkflow&stepId=review-vm&...'
//! ```
//!
//! # Commands
//!
//! - `instances list` - List instances through the Vultr API
//! - `token inspect` - Decode a resumption token

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ktomg-cli")]
#[command(author, version, about = "KTOMG ops assistant CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect Vultr instances
    Instances {
        #[command(subcommand)]
        action: InstancesAction,
    },
    /// Work with approval resumption tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum InstancesAction {
    /// List all instances on the account
    List,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Decode a resumption token and print its fields
    Inspect {
        /// The raw button value
        raw: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Instances { action } => match action {
            InstancesAction::List => commands::instances::list().await?,
        },
        Commands::Token { action } => match action {
            TokenAction::Inspect { raw } => commands::token::inspect(&raw)?,
        },
    }
    Ok(())
}
