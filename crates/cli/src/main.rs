//! FixFlow CLI - Database migrations and user management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema + session table)
//! fixflow migrate
//!
//! # Promote a client to collaborator
//! fixflow users promote <USER_ID>
//!
//! # Bootstrap the administrator
//! fixflow users promote <USER_ID> --to admin
//!
//! # List users by role
//! fixflow users list --role client
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fixflow")]
#[command(author, version, about = "FixFlow CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user profiles
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Raise a user's role
    Promote {
        /// Profile ID (identity-provider UUID)
        id: String,

        /// Target role (`collaborator` or `admin`)
        #[arg(long, default_value = "collaborator")]
        to: String,
    },
    /// List users with a role
    List {
        /// Role to list (`client`, `collaborator`, `admin`)
        #[arg(short, long, default_value = "client")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Users { action } => match action {
            UserAction::Promote { id, to } => commands::users::promote(&id, &to).await?,
            UserAction::List { role } => commands::users::list(&role).await?,
        },
    }
    Ok(())
}
