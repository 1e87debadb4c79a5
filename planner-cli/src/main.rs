mod commands;
mod render;
mod utils;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use planner_core::PlannerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "visual-planner")]
#[command(about = "Lay out your calendars as a scrolling grid of months")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page of months and print its layout
    Show {
        /// First visible month (YYYY-MM); defaults to the configured start
        #[arg(short, long)]
        anchor: Option<String>,

        /// Print layout descriptors as JSON
        #[arg(long)]
        json: bool,

        /// Run an incremental sync after the initial load
        #[arg(long)]
        sync: bool,
    },
    /// List calendars and whether they are shown
    Calendars {
        /// Pick the shown calendars interactively
        #[arg(short, long)]
        select: bool,
    },
    /// Show or hide a calendar
    Toggle { calendar_id: String },
    /// Open a day or month in the calendar web app
    Open {
        /// Day to open (YYYY-MM-DD)
        date: NaiveDate,

        /// Create a new event on that day instead
        #[arg(long, conflicts_with = "month")]
        new: bool,

        /// Open the whole month
        #[arg(long)]
        month: bool,
    },
    /// Authorize access to Google Calendar
    Auth,
    /// Revoke the stored authorization
    Logout,
    /// Show configuration paths
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::load()?;

    match cli.command {
        Commands::Show { anchor, json, sync } => {
            let anchor = anchor.as_deref().map(commands::show::parse_anchor).transpose()?;
            commands::show::run(&config, anchor, json, sync).await
        }
        Commands::Calendars { select } => commands::calendars::run(&config, select).await,
        Commands::Toggle { calendar_id } => commands::calendars::toggle(&config, &calendar_id).await,
        Commands::Open { date, new, month } => commands::open::run(date, new, month),
        Commands::Auth => commands::auth::run(&config).await,
        Commands::Logout => commands::auth::logout().await,
        Commands::Config => commands::config::run(),
    }
}
