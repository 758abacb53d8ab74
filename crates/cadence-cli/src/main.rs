use anyhow::Result;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::series::{SeriesConfig, SeriesManager};
use cadence_core::store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli, config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli, config: config::Config) -> Result<()> {
    let manager = SeriesManager::new(SeriesConfig {
        timezone: config.timezone.clone(),
    })?;
    let database_path = cli.database.unwrap_or(config.database_path);
    let store = SqliteStore::new(db::establish_connection(&database_path).await?);

    let explicit_catch_up = matches!(cli.command, cli::Commands::CatchUp);
    if config.catch_up_on_start && !cli.no_catch_up && !explicit_catch_up {
        commands::catch_up::catch_up_quietly(&manager, &store).await?;
    }

    match cli.command {
        cli::Commands::Add(command) => commands::add::add_occurrence(&manager, &store, command).await,
        cli::Commands::List(command) => commands::list::list_occurrences(&manager, &store, command).await,
        cli::Commands::Done(command) => commands::done::complete_occurrence(&manager, &store, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_occurrence(&manager, &store, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_occurrence(&manager, &store, command).await,
        cli::Commands::CatchUp => commands::catch_up::catch_up(&manager, &store).await,
        cli::Commands::Preview(command) => {
            commands::preview::preview_series(&manager, &store, command, config.default_preview_count).await
        }
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(occurrences) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in occurrences {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidRule(s) => {
                eprintln!("{} Invalid recurrence rule: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidTimezone(tz) => {
                eprintln!("{} Unknown timezone '{}'.", "Error:".style(error_style), tz.yellow());
                eprintln!("Did you mean one of these?");
                for suggestion in config::suggest_timezone(tz) {
                    eprintln!("  {}", suggestion);
                }
            }
            CoreError::ChainCycle(id) => {
                eprintln!(
                    "{} The series containing {} links back to itself; its lineage needs repair.",
                    "Error:".style(error_style),
                    id.to_string().yellow()
                );
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
