use anyhow::Result;
use clap::Parser;
use log::{debug, info};

mod cli;

use cli::{Cli, Commands};
use cli::commands::{handle_flow_command, handle_mapping_command, handle_query_command};
use powertools::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger to file (truncate on each run)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("powertools.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    info!("Starting powertools");

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!("Using api path {}", config.settings.api_path);

    match cli.command {
        Commands::Query(args) => handle_query_command(args, &config).await,
        Commands::Flow(args) => handle_flow_command(args, &config).await,
        Commands::Mapping(args) => handle_mapping_command(args, config, cli.config.as_deref()).await,
    }
}
