//! Command-line reader for a running mission backend.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mission_client::MissionClient;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Query launches, missions and NASA imagery through the mission proxy
#[derive(Parser, Debug)]
#[command(name = "mission-client")]
#[command(version)]
struct Cli {
    /// Base URL of the mission backend
    #[arg(long, default_value = "http://localhost:5000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upcoming launches
    Upcoming,
    /// Recent launches
    Previous,
    /// One launch with rocket and mission details
    Launch { id: String },
    /// Astronomy Picture of the Day
    Apod,
    /// Search the NASA image library
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Latest EPIC Earth images
    Epic,
    /// Upcoming and previous launches together
    Missions {
        /// Print the bundled mission list if the backend cannot be reached
        #[arg(long)]
        fallback: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let client = MissionClient::new(&cli.base_url)?;

    match cli.command {
        Command::Upcoming => print_json(&client.upcoming_launches().await?),
        Command::Previous => print_json(&client.previous_launches().await?),
        Command::Launch { id } => print_json(&client.launch_by_id(&id).await?),
        Command::Apod => print_json(&client.picture_of_day().await?),
        Command::Search { query, page } => print_json(&client.search_images(&query, page).await?),
        Command::Epic => print_json(&client.earth_imagery().await?),
        Command::Missions { fallback: true } => print_json(&client.missions_or_fallback().await?),
        Command::Missions { fallback: false } => print_json(&client.all_missions().await?),
    }
}
