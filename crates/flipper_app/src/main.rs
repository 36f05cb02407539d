mod cli;
mod commands;
mod config;
mod logging;
mod render;

use std::sync::Arc;

use clap::Parser;

use flipper_engine::{ReqwestApi, ServiceApi};
use flipper_logging::{flipper_debug, flipper_info};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    logging::initialize(config.log, cli.verbose);
    match &config.source {
        Some(path) => flipper_info!("Loaded configuration from {}", path.display()),
        None => flipper_info!("No configuration file, using defaults"),
    }
    flipper_debug!("using service at {}", config.base_url);

    let api: Arc<dyn ServiceApi> = Arc::new(ReqwestApi::new(config.client_settings())?);
    match cli.command {
        Commands::Batch {
            batch_id,
            state,
            pages,
        } => commands::batch(api, &config, batch_id, state, pages).await,
        Commands::Counters { batch_id } => commands::counters(api, &config, batch_id).await,
        Commands::Watch { job_id, template } => {
            commands::watch(api, &config, job_id, template).await
        }
        Commands::Quick { file, template } => {
            commands::quick(api, &config, &file, template).await
        }
        Commands::Dashboard => commands::dashboard(api, &config).await,
        Commands::Templates => commands::templates(api).await,
    }
}
