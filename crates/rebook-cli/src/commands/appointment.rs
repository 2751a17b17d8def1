use anyhow::{anyhow, Result};
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use rebook_core::models::{BulkAction, RescheduleTo};
use uuid::Uuid;

use crate::cli::{AppointmentCommand, AppointmentSubcommand, RescheduleCommand, TargetArgs};
use crate::commands::App;
use crate::config::Config;
use crate::parser::{parse_datetime, parse_time};
use crate::util::parse_id;
use crate::views::table::display_bulk_report;

pub async fn appointment_command(
    app: &App,
    command: AppointmentCommand,
    config: &Config,
) -> Result<()> {
    let (action, targets) = match command.command {
        AppointmentSubcommand::Complete(targets) => (BulkAction::Complete, targets),
        AppointmentSubcommand::Cancel(targets) => (BulkAction::Cancel, targets),
        AppointmentSubcommand::Reschedule(command) => reschedule_action(command)?,
    };
    let ids = target_ids(&targets)?;

    let report = app
        .appointment_command(action, &ids, targets.remaining, Utc::now())
        .await?;
    display_bulk_report(&report, &config.timezone());

    let summary = format!(
        "{} {}: {} succeeded, {} failed",
        if report.failed() == 0 { "✓" } else { "!" },
        report.action,
        report.succeeded(),
        report.failed()
    );
    if report.failed() == 0 {
        println!("{}", summary.style(Style::new().green().bold()));
        Ok(())
    } else {
        println!("{}", summary.style(Style::new().yellow().bold()));
        Err(anyhow!(
            "{} of {} appointments could not be updated",
            report.failed(),
            report.results.len()
        ))
    }
}

fn reschedule_action(command: RescheduleCommand) -> Result<(BulkAction, TargetArgs)> {
    let to = match (command.at.as_deref(), command.shift_days) {
        (Some(at), _) => RescheduleTo::At(parse_datetime(at)?),
        (None, Some(days)) => RescheduleTo::Shift {
            days,
            time: command.time.as_deref().map(parse_time).transpose()?,
        },
        (None, None) => match command.time.as_deref() {
            Some(time) => RescheduleTo::Shift {
                days: 0,
                time: Some(parse_time(time)?),
            },
            None => return Err(anyhow!("Use --at, --shift-days or --time to say where to move to")),
        },
    };
    Ok((BulkAction::Reschedule(to), command.targets))
}

fn target_ids(targets: &TargetArgs) -> Result<Vec<Uuid>> {
    targets.ids.iter().map(|id| parse_id(id)).collect()
}
