//! Dukasasa CLI - credential store migrations and management.
//!
//! # Usage
//!
//! ```bash
//! # Run credential store migrations
//! duka-cli migrate
//!
//! # Create a local credential record
//! duka-cli credential create -e customer@example.co.ke -p 'long-enough'
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `credential create` - Create a local credential

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "duka-cli")]
#[command(author, version, about = "Dukasasa storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run credential store migrations
    Migrate,
    /// Manage local credentials
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
}

#[derive(Subcommand)]
enum CredentialAction {
    /// Create a new credential record
    Create {
        /// Customer email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Credential { action } => match action {
            CredentialAction::Create { email, password } => {
                commands::credential::create(&email, &password).await?;
            }
        },
    }
    Ok(())
}
