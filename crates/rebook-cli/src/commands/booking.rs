use anyhow::Result;
use chrono::Duration;
use owo_colors::{OwoColorize, Style};
use rebook_core::models::{Buffers, NewBooking};
use rebook_core::timezone::{format_in_timezone, resolve_local};

use crate::cli::{AddBookingCommand, BookingCommand, BookingSubcommand};
use crate::commands::App;
use crate::config::{validate_timezone, Config};
use crate::parser::parse_datetime;

pub async fn booking_command(app: &App, command: BookingCommand, config: &Config) -> Result<()> {
    match command.command {
        BookingSubcommand::Add(command) => add_booking(app, command, config).await,
    }
}

async fn add_booking(app: &App, command: AddBookingCommand, config: &Config) -> Result<()> {
    let tz = match command.timezone.as_deref() {
        Some(name) => validate_timezone(name).map_err(anyhow::Error::msg)?,
        None => config.timezone(),
    };
    let start_at = resolve_local(&tz, parse_datetime(&command.start)?);

    let booking = app
        .add_booking(NewBooking {
            resource_id: command.resource,
            start_at,
            end_at: start_at + Duration::minutes(i64::from(command.duration)),
            buffers: Buffers {
                before: command.buffer_before,
                after: command.buffer_after,
            },
            notes: command.notes,
        })
        .await?;

    println!(
        "{} Booked {} on {}",
        "✓".style(Style::new().green().bold()),
        format_in_timezone(booking.start_at, &tz, "%a %Y-%m-%d %H:%M"),
        booking.resource_id.bright_white().bold()
    );
    println!("  → Appointment ID: {}", booking.id.to_string().yellow());
    Ok(())
}
