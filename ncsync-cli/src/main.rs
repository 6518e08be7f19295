mod commands;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ncsync_core::Settings;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "ncsync")]
#[command(about = "Pull events from a Nextcloud calendar into local calendar records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull remote events for every enabled calendar
    Sync {
        /// Only sync this calendar (by name)
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// List the calendars available on the server
    Calendars,
    /// Show locally stored events
    Events {
        /// Calendar to show (by name)
        #[arg(short, long)]
        calendar: String,

        /// Include closed events
        #[arg(long)]
        all: bool,
    },
    /// Store server URL and credentials, then pick calendars to sync
    Connect,
    /// Show config and data paths
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { calendar } => {
            let settings = Settings::load()?;
            require_calendars(&settings)?;
            commands::sync::run(&settings, calendar.as_deref()).await
        }
        Commands::Calendars => {
            let settings = Settings::load()?;
            commands::calendars::run(&settings).await
        }
        Commands::Events { calendar, all } => {
            let settings = Settings::load()?;
            require_calendars(&settings)?;
            commands::events::run(&settings, &calendar, all)
        }
        Commands::Connect => commands::connect::run().await,
        Commands::Config => commands::config::run(),
    }
}

fn require_calendars(settings: &Settings) -> Result<()> {
    if settings.calendars.is_empty() {
        anyhow::bail!(
            "No calendars configured.\n\n\
            Connect to your Nextcloud with:\n  \
            ncsync connect"
        );
    }

    Ok(())
}
