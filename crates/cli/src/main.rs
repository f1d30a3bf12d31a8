//! Delicious CLI - Database migrations and sample data.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! delicious-cli migrate
//!
//! # Load sample stores authored by an existing user
//! delicious-cli seed --file data/stores.json --author-email wes@example.com
//!
//! # Delete every store, review, and heart
//! delicious-cli wipe --yes
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "delicious-cli")]
#[command(author, version, about = "Delicious CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load stores from a JSON file
    Seed {
        /// JSON array of stores (name, description, tags, address, longitude, latitude, photo)
        #[arg(short, long)]
        file: PathBuf,

        /// Email of the registered user who will own the stores
        #[arg(short, long)]
        author_email: String,
    },
    /// Delete all stores, reviews, and hearts (users are kept)
    Wipe {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, author_email } => {
            commands::seed::stores(&file, &author_email).await?;
        }
        Commands::Wipe { yes } => commands::wipe::run(yes).await?,
    }
    Ok(())
}
