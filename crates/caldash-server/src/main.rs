//! caldash entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use caldash_core::{TracingConfig, init_tracing};
use caldash_server::cli::{Cli, Command, ConfigAction};
use caldash_server::commands;
use caldash_server::config::ServerConfig;
use caldash_server::error::{ServerError, ServerResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let tracing_config = TracingConfig::default()
        .with_level(level)
        .with_format(cli.log_format)
        .with_source_location(cli.debug);
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let path = cli.config.clone().unwrap_or_else(ServerConfig::default_path);
    let mut config = match cli.config {
        Some(ref path) => ServerConfig::load_from(path),
        None => ServerConfig::load(),
    }
    .map_err(ServerError::config)?;

    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&path),
        },
        Some(Command::Serve) | None => commands::serve::run(&config).await,
    }
}
