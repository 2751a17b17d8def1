use anyhow::{anyhow, Result};
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use rebook_core::models::SeriesMetadata;
use rebook_core::timezone::{format_in_timezone, parse_timezone};

use crate::cli::{ConfirmCommand, PreviewCommand};
use crate::commands::App;
use crate::parser::{parse_amount_cents, parse_date, parse_sequences};
use crate::util::{parse_id, short_id, today_in};
use crate::views::table::{display_appointments, display_occurrences};

pub async fn preview(app: &App, command: PreviewCommand) -> Result<()> {
    let pattern = app.find_pattern(parse_id(&command.pattern_id)?).await?;
    let tz = parse_timezone(&pattern.timezone)?;
    let window_start = match command.from.as_deref() {
        Some(from) => parse_date(from)?,
        None => today_in(&tz),
    };

    let occurrences = app
        .preview_occurrences(pattern.id, command.max, window_start)
        .await?;
    display_occurrences(&occurrences, &tz);

    let bookable = occurrences.iter().filter(|o| o.is_bookable()).count();
    let conflicts = occurrences.iter().filter(|o| !o.conflicts.is_empty()).count();
    println!(
        "{} bookable, {} with conflicts, {} excluded",
        bookable,
        conflicts,
        occurrences.len() - bookable - conflicts
    );
    Ok(())
}

pub async fn confirm(app: &App, command: ConfirmCommand) -> Result<()> {
    let pattern = app.find_pattern(parse_id(&command.pattern_id)?).await?;
    let tz = parse_timezone(&pattern.timezone)?;
    let window_start = match command.from.as_deref() {
        Some(from) => parse_date(from)?,
        None => today_in(&tz),
    };

    let accepted = match command.accept.as_deref() {
        Some(list) => parse_sequences(list)?,
        None => app
            .preview_occurrences(pattern.id, None, window_start)
            .await?
            .iter()
            .filter(|o| o.is_bookable())
            .filter_map(|o| o.sequence)
            .collect(),
    };
    if accepted.is_empty() {
        return Err(anyhow!("No bookable occurrences to confirm"));
    }

    let metadata = SeriesMetadata {
        title: command.title,
        client_name: command.client,
        notes: command.notes,
        payment_type: command.payment_type,
        total_series_price_cents: command.price.as_deref().map(parse_amount_cents).transpose()?,
    };
    let confirmation = app
        .confirm_series(pattern.id, &accepted, metadata, window_start, Utc::now())
        .await?;

    let success_style = Style::new().green().bold();
    let warn_style = Style::new().yellow().bold();
    for rejected in &confirmation.rejected {
        let suggestion = rejected
            .conflicts
            .first()
            .and_then(|c| c.suggested_resolution)
            .map(|at| format!(", next open slot {}", format_in_timezone(at, &tz, "%H:%M")))
            .unwrap_or_default();
        println!(
            "{} Occurrence {} on {} conflicts with an existing booking{}",
            "!".style(warn_style),
            rejected.sequence,
            rejected.scheduled_for.format("%Y-%m-%d %H:%M"),
            suggestion
        );
    }

    match &confirmation.series {
        Some(series) => {
            println!(
                "{} Confirmed series '{}' with {} appointments",
                "✓".style(success_style),
                series.title.bright_white().bold(),
                series.total_planned
            );
            println!(
                "  → Series ID: {} ({})",
                series.id.to_string().yellow(),
                short_id(series.id)
            );
            display_appointments(&confirmation.appointments, &tz);
            Ok(())
        }
        None => Err(anyhow!("No occurrence could be booked; nothing was saved")),
    }
}
