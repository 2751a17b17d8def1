use clap::Parser;
use owo_colors::{OwoColorize, Style};
use rebook_core::db;
use rebook_core::error::CoreError;
use rebook_core::repository::SqliteRepository;
use rebook_core::scheduler::Scheduler;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Warning:".yellow().bold(), e);
            config::Config::default()
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let app = Scheduler::new(
        SqliteRepository::new(db_pool),
        config.holiday_calendar(),
        config.engine.clone(),
    );

    let result = match cli.command {
        cli::Commands::Pattern(command) => {
            commands::pattern::pattern_command(&app, command, &config).await
        }
        cli::Commands::Preview(command) => commands::preview::preview(&app, command).await,
        cli::Commands::Confirm(command) => commands::preview::confirm(&app, command).await,
        cli::Commands::Series(command) => {
            commands::series::series_command(&app, command, &config).await
        }
        cli::Commands::Appointment(command) => {
            commands::appointment::appointment_command(&app, command, &config).await
        }
        cli::Commands::Booking(command) => {
            commands::booking::booking_command(&app, command, &config).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::Validation(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::StateConflict { status, command, .. } => {
                eprintln!(
                    "{} Cannot {} a series that is {}",
                    "Error:".style(error_style),
                    command,
                    status.yellow()
                );
            }
            CoreError::ConcurrentModification(id) => {
                eprintln!(
                    "{} Series {} changed while this command ran. Please retry.",
                    "Error:".style(error_style),
                    id.yellow()
                );
            }
            CoreError::InvalidTimezone(s) => {
                eprintln!("{} Invalid timezone: {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::Database(source) => {
                eprintln!("{} {}: {}", "Error:".style(error_style), err, source);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
