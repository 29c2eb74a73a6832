//! Boxset CLI - Database migrations and ledger management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! boxset-cli migrate
//!
//! # Register a buyer
//! boxset-cli customer add -e fan@example.fr --first-name Jeanne --melancolie 2 --symphonie 1
//!
//! # Count confirmation emails per delivery state
//! boxset-cli outbox status
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use boxset_core::PackCounts;

mod commands;

#[derive(Parser)]
#[command(name = "boxset-cli")]
#[command(author, version, about = "Boxset CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the customer ledger
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// Inspect the confirmation email outbox
    Outbox {
        #[command(subcommand)]
        action: OutboxAction,
    },
}

#[derive(Subcommand)]
enum CustomerAction {
    /// Register a buyer
    Add {
        /// Customer email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(long)]
        first_name: Option<String>,

        /// Last name
        #[arg(long)]
        last_name: Option<String>,

        /// Mélancolie packs purchased
        #[arg(long, default_value_t = 0)]
        melancolie: u32,

        /// Symphonie des siècles packs purchased
        #[arg(long, default_value_t = 0)]
        symphonie: u32,
    },
}

#[derive(Subcommand)]
enum OutboxAction {
    /// Count entries per delivery state
    Status,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Customer { action } => match action {
            CustomerAction::Add {
                email,
                first_name,
                last_name,
                melancolie,
                symphonie,
            } => {
                commands::customer::add(
                    &email,
                    first_name,
                    last_name,
                    PackCounts::new(melancolie, symphonie),
                )
                .await?;
            }
        },
        Commands::Outbox { action } => match action {
            OutboxAction::Status => commands::outbox::status().await?,
        },
    }
    Ok(())
}
