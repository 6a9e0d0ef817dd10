use std::env;
use std::process::ExitCode;

use clap::Parser;
use smartCalendar::cli::{self, Cli, Commands};
use smartCalendar::config::{AppConfig, RunMode, Settings};
use smartCalendar::runtime::{self, Services};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let config_path = args.config.clone().or_else(|| env::var("CONFIG_FILE").ok());
    let config = match config_path {
        Some(path) => match AppConfig::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };
    let settings = match Settings::from_config(&config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let services = Services::from_settings(&settings);
    let result = match args.command {
        Some(Commands::Serve { bind }) => {
            let bind = bind.unwrap_or_else(|| settings.api_bind.clone());
            runtime::run_api(services, &bind).await
        }
        Some(Commands::Shell) => cli::shell(services).await,
        None => match settings.run_mode {
            RunMode::Api => runtime::run_api(services, &settings.api_bind).await,
            RunMode::Cli => cli::shell(services).await,
        },
    };

    if let Err(err) = result {
        error!("{}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
