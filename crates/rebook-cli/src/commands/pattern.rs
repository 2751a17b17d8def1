use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use rebook_core::models::NewPattern;
use rebook_core::recurrence::to_rrule;

use crate::cli::{CreatePatternCommand, PatternCommand, PatternSubcommand, ShowPatternCommand};
use crate::commands::App;
use crate::config::{validate_timezone, Config};
use crate::parser::{parse_date, parse_time, parse_weekday, parse_weekdays};
use crate::util::{parse_id, today_in};
use crate::views::table::display_pattern;

pub async fn pattern_command(app: &App, command: PatternCommand, config: &Config) -> Result<()> {
    match command.command {
        PatternSubcommand::Create(command) => create_pattern(app, command, config).await,
        PatternSubcommand::Show(command) => show_pattern(app, command).await,
    }
}

async fn create_pattern(app: &App, command: CreatePatternCommand, config: &Config) -> Result<()> {
    let timezone = command
        .timezone
        .clone()
        .unwrap_or_else(|| config.default_timezone.clone());
    let tz = validate_timezone(&timezone).map_err(anyhow::Error::msg)?;
    let today = today_in(&tz);

    let start_date = command.start.as_deref().map(parse_date).transpose()?.unwrap_or(today);
    let anchor_date = match (&command.anchor, command.interval) {
        (Some(anchor), _) => Some(parse_date(anchor)?),
        (None, Some(_)) => Some(start_date),
        (None, None) => None,
    };

    let data = NewPattern {
        resource_id: command.resource,
        pattern_type: command.pattern_type,
        preferred_time: parse_time(&command.time)?,
        duration_minutes: command.duration,
        start_date,
        end_date: command.until.as_deref().map(parse_date).transpose()?,
        occurrence_count: command.count,
        days_of_week: command
            .days
            .as_deref()
            .map(parse_weekdays)
            .transpose()?
            .unwrap_or_default(),
        day_of_month: command.day_of_month,
        week_of_month: command.week_of_month,
        weekday_of_month: command.weekday.as_deref().map(parse_weekday).transpose()?,
        interval_days: command.interval,
        anchor_date,
        exclude_holidays: command.exclude_holidays,
        exclude_weekends: command.exclude_weekends,
        reschedule_on_conflict: command.reschedule_on_conflict,
        max_advance_days: command.max_advance,
        buffer_before: command.buffer_before,
        buffer_after: command.buffer_after,
        timezone,
    };

    let pattern = app.create_pattern(data, today).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    println!(
        "{} Created {} pattern on {}",
        "✓".style(success_style),
        pattern.pattern_type,
        pattern.resource_id.bright_white().bold()
    );
    println!("  {} Pattern ID: {}", "→".style(info_style), pattern.id.to_string().yellow());
    println!(
        "  {} Preview it with: rebook preview {}",
        "→".style(info_style),
        pattern.id
    );
    Ok(())
}

async fn show_pattern(app: &App, command: ShowPatternCommand) -> Result<()> {
    let pattern = app.find_pattern(parse_id(&command.id)?).await?;
    let rrule = to_rrule(&pattern).ok();
    display_pattern(&pattern, rrule.as_deref());
    Ok(())
}
