//! calactions CLI entry point.

use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use calactions_client::cli::{Cli, Command, ConfigAction};
use calactions_client::commands;
use calactions_client::config::ClientConfig;
use calactions_client::error::{ClientError, ClientResult};
use calactions_core::{TracingConfig, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let loaded = match cli.config {
        Some(_) => ClientConfig::load_from(&config_path),
        None => ClientConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", ClientError::Config(e));
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(TracingConfig::cli(cli.debug || config.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig, config_path: &Path) -> ClientResult<()> {
    let time_zone = cli.time_zone.as_deref();
    let google = config.google_config(time_zone);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Command::Auth {
            credentials_file,
            force,
        } => commands::auth::google(credentials_file, force, google, config_path).await,
        Command::List {
            start,
            days,
            email,
            json,
        } => {
            let client = commands::connect(&google).await?;
            commands::list::run(&client, start, days, email.as_deref(), json, &mut stdout).await
        }
        Command::Create { event } => {
            let client = commands::connect(&google).await?;
            commands::create::run(&client, event).await
        }
        Command::Delete { id } => {
            let client = commands::connect(&google).await?;
            commands::delete::run(&client, id.as_deref(), &mut stdout).await
        }
        Command::Demo { email, email2 } => {
            let client = commands::connect(&google).await?;
            commands::demo::run(&client, &email, &email2, &mut stdout).await
        }
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, config_path),
            ConfigAction::Validate => commands::config::validate(&config, time_zone),
            ConfigAction::Path => commands::config::path(config_path),
        },
    }
}
