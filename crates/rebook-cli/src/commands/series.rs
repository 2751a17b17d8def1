use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use rebook_core::models::{Series, SeriesCommand as LifecycleCommand};
use rebook_core::timezone::parse_timezone;

use crate::cli::{ConfirmedSeriesArgs, PayCommand, SeriesCommand, SeriesSubcommand};
use crate::commands::App;
use crate::config::Config;
use crate::parser::{format_cents, parse_amount_cents};
use crate::util::resolve_series_id;
use crate::views::table::{display_appointments, display_series_list, display_statistics};

pub async fn series_command(app: &App, command: SeriesCommand, config: &Config) -> Result<()> {
    let success_style = Style::new().green().bold();

    match command.command {
        SeriesSubcommand::List(command) => {
            let series = app.list_series(command.status).await?;
            display_series_list(&series);
        }
        SeriesSubcommand::Show(args) => {
            let series = app.find_series(resolve_series_id(app, &args.id).await?).await?;
            let tz = series_timezone(app, &series, config).await;
            display_series_list(std::slice::from_ref(&series));
            display_appointments(&app.series_appointments(series.id).await?, &tz);
        }
        SeriesSubcommand::Pause(args) => {
            let id = resolve_series_id(app, &args.id).await?;
            let series = app.series_command(id, LifecycleCommand::Pause, Utc::now()).await?;
            println!("{} Paused series '{}'", "✓".style(success_style), series.title);
        }
        SeriesSubcommand::Resume(args) => {
            let id = resolve_series_id(app, &args.id).await?;
            let series = app.series_command(id, LifecycleCommand::Resume, Utc::now()).await?;
            println!(
                "{} Resumed series '{}' ({})",
                "✓".style(success_style),
                series.title,
                series.status
            );
        }
        SeriesSubcommand::Cancel(args) => {
            let id = resolve_series_id(app, &args.id).await?;
            let series = app.find_series(id).await?;
            let prompt = format!(
                "Cancel series '{}' and all its upcoming appointments?",
                series.title
            );
            if !confirmed(&args, &prompt) {
                println!("Cancellation aborted.");
                return Ok(());
            }
            let series = app.series_command(id, LifecycleCommand::Cancel, Utc::now()).await?;
            println!(
                "{} Cancelled series '{}': {} completed, {} cancelled",
                "✓".style(success_style),
                series.title,
                series.total_completed,
                series.total_cancelled
            );
        }
        SeriesSubcommand::Stats(args) => {
            let id = resolve_series_id(app, &args.id).await?;
            let series = app.find_series(id).await?;
            let tz = series_timezone(app, &series, config).await;
            let stats = app.series_statistics(id, Utc::now()).await?;
            println!("{}", series.title.bright_white().bold());
            display_statistics(&stats, &tz);
        }
        SeriesSubcommand::Reconcile(args) => {
            let id = resolve_series_id(app, &args.id).await?;
            let before = app.find_series(id).await?;
            let after = app.reconcile_series(id, Utc::now()).await?;
            if after.version == before.version {
                println!("Series counters already match its appointments.");
            } else {
                println!(
                    "{} Reconciled: {} completed, {} cancelled, {} rescheduled",
                    "✓".style(success_style),
                    after.total_completed,
                    after.total_cancelled,
                    after.total_rescheduled
                );
            }
        }
        SeriesSubcommand::Pay(command) => pay(app, command).await?,
        SeriesSubcommand::Refund(args) => {
            let id = resolve_series_id(app, &args.id).await?;
            let series = app.find_series(id).await?;
            if !confirmed(
                &args,
                &format!(
                    "Refund {} paid for '{}'?",
                    format_cents(series.paid_amount_cents),
                    series.title
                ),
            ) {
                println!("Refund aborted.");
                return Ok(());
            }
            let series = app.refund(id, Utc::now()).await?;
            println!("{} Refunded series '{}'", "✓".style(success_style), series.title);
        }
    }
    Ok(())
}

async fn pay(app: &App, command: PayCommand) -> Result<()> {
    let id = resolve_series_id(app, &command.id).await?;
    let amount = parse_amount_cents(&command.amount)?;
    let series = app.record_payment(id, amount, Utc::now()).await?;
    println!(
        "{} Recorded {} for '{}': {} paid, status {}",
        "✓".style(Style::new().green().bold()),
        format_cents(amount),
        series.title,
        format_cents(series.paid_amount_cents),
        series.payment_status
    );
    Ok(())
}

fn confirmed(args: &ConfirmedSeriesArgs, prompt: &str) -> bool {
    args.yes
        || Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
}

/// Times of a series are shown in its pattern's timezone.
async fn series_timezone(app: &App, series: &Series, config: &Config) -> Tz {
    match app.find_pattern(series.pattern_id).await {
        Ok(pattern) => parse_timezone(&pattern.timezone).unwrap_or_else(|_| config.timezone()),
        Err(_) => config.timezone(),
    }
}
