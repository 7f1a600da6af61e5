use clap::{Parser, Subcommand};
use migration::RefreshCost;
use std::error::Error;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

/// DeSo explorer statistics schema CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands for the statistics schema
#[derive(Subcommand)]
enum Commands {
    /// Install pending statistics migrations
    Migrate {
        /// Number of migrations to run (all if not specified)
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back applied statistics migrations
    Rollback {
        /// Number of migrations to roll back (all if not specified)
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back every statistics migration and apply them again
    Reset,
    /// Show statistics migration status
    Status,
    /// Manage the foreign-data-wrapper layer on the subscriber database
    Subscriber {
        #[command(subcommand)]
        command: SubscriberCommands,
    },
    /// Top up first-transaction data and refresh materialized views
    Refresh {
        /// Most expensive views to include: light, medium or heavy
        #[arg(long, default_value = "heavy")]
        max_cost: RefreshCost,
        /// Skip the public_key_first_transaction top-up
        #[arg(long)]
        skip_top_up: bool,
    },
    /// Print the object catalog as JSON
    Catalog,
}

#[derive(Subcommand)]
enum SubscriberCommands {
    /// Import published statistics from the publisher
    Migrate,
    /// Drop the imported statistics and the foreign server
    Rollback,
    /// Show subscriber migration status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { steps } => {
            commands::migrate::execute(steps).await?;
        }
        Commands::Rollback { steps } => {
            commands::migrate::rollback(steps).await?;
        }
        Commands::Reset => {
            commands::migrate::reset().await?;
        }
        Commands::Status => {
            commands::migrate::status().await?;
        }
        Commands::Subscriber { command } => match command {
            SubscriberCommands::Migrate => commands::migrate::subscriber_execute().await?,
            SubscriberCommands::Rollback => commands::migrate::subscriber_rollback().await?,
            SubscriberCommands::Status => commands::migrate::subscriber_status().await?,
        },
        Commands::Refresh {
            max_cost,
            skip_top_up,
        } => {
            commands::refresh::execute(max_cost, skip_top_up).await?;
        }
        Commands::Catalog => {
            commands::catalog::execute()?;
        }
    }

    Ok(())
}
