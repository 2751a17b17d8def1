use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use rebook_core::bulk::{BulkReport, TargetOutcome};
use rebook_core::models::{
    Appointment, AppointmentStatus, Occurrence, OccurrenceStatus, PatternDefinition, Series,
    SeriesStatistics, SeriesStatus,
};
use rebook_core::timezone::format_in_timezone;

use crate::parser::format_cents;
use crate::util::short_id;

const LOCAL_FORMAT: &str = "%a %Y-%m-%d %H:%M";

pub fn display_pattern(pattern: &PatternDefinition, rrule: Option<&str>) {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);

    let days = pattern
        .days_of_week
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let limit = match (pattern.occurrence_count, pattern.end_date) {
        (Some(count), _) => format!("{} occurrences", count),
        (None, Some(end)) => format!("until {}", end),
        (None, None) => "none".to_string(),
    };

    let rows: Vec<(&str, String)> = vec![
        ("ID", pattern.id.to_string()),
        ("Resource", pattern.resource_id.clone()),
        ("Type", pattern.pattern_type.to_string()),
        ("Days", if days.is_empty() { "-".to_string() } else { days }),
        ("Time", pattern.preferred_time.format("%H:%M").to_string()),
        ("Duration", format!("{} min", pattern.duration_minutes)),
        ("Starts", pattern.start_date.to_string()),
        ("Limit", limit),
        ("Timezone", pattern.timezone.clone()),
        (
            "Buffers",
            format!("{} / {} min", pattern.buffer_before, pattern.buffer_after),
        ),
        ("Max advance", format!("{} days", pattern.max_advance_days)),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field).add_attribute(Attribute::Bold), Cell::new(value)]);
    }
    if let Some(rrule) = rrule {
        table.add_row(vec![
            Cell::new("RRULE").add_attribute(Attribute::Bold),
            Cell::new(rrule),
        ]);
    }

    println!("{table}");
}

pub fn display_occurrences(occurrences: &[Occurrence], tz: &Tz) {
    if occurrences.is_empty() {
        println!("No occurrences in the generation window.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "When", "Status", "Notes"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(
            occurrence
                .sequence
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));
        row.add_cell(Cell::new(format_in_timezone(
            occurrence.start_at,
            tz,
            LOCAL_FORMAT,
        )));

        let (status_cell, notes) = match occurrence.status {
            OccurrenceStatus::Available => {
                (Cell::new("available").fg(Color::Green), String::new())
            }
            OccurrenceStatus::Excluded => (
                Cell::new("excluded").fg(Color::DarkGrey),
                occurrence
                    .exclusion
                    .map(|reason| reason.to_string())
                    .unwrap_or_default(),
            ),
            OccurrenceStatus::Conflict => {
                let suggestion = occurrence
                    .conflicts
                    .first()
                    .and_then(|c| c.suggested_resolution)
                    .map(|at| format!("next open: {}", format_in_timezone(at, tz, "%H:%M")))
                    .unwrap_or_else(|| "no open slot that day".to_string());
                (
                    Cell::new("conflict").fg(Color::Red).add_attribute(Attribute::Bold),
                    suggestion,
                )
            }
        };
        row.add_cell(status_cell);
        row.add_cell(Cell::new(notes));
        table.add_row(row);
    }

    println!("{table}");
}

fn series_status_cell(status: SeriesStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        SeriesStatus::Active => cell.fg(Color::Green),
        SeriesStatus::InProgress => cell.fg(Color::Cyan),
        SeriesStatus::Paused => cell.fg(Color::Yellow),
        SeriesStatus::Completed => cell.fg(Color::Blue),
        SeriesStatus::Cancelled => cell.fg(Color::DarkGrey),
    }
}

pub fn display_series_list(series: &[Series]) {
    if series.is_empty() {
        println!("No series found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Resource", "Status", "Progress", "Payment"]);

    for s in series {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(s.id)));
        let mut title = Cell::new(&s.title);
        if s.status == SeriesStatus::Cancelled {
            title = title.add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey);
        }
        row.add_cell(title);
        row.add_cell(Cell::new(&s.resource_id));
        row.add_cell(series_status_cell(s.status));
        row.add_cell(Cell::new(format!(
            "{}/{} done, {} cancelled",
            s.total_completed, s.total_planned, s.total_cancelled
        )));
        row.add_cell(Cell::new(s.payment_status.to_string()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_appointments(appointments: &[Appointment], tz: &Tz) {
    if appointments.is_empty() {
        println!("No appointments.");
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "When", "Status", "Moved from"]);

    for appointment in appointments {
        let mut row = Row::new();
        row.add_cell(Cell::new(
            appointment
                .sequence
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));
        row.add_cell(Cell::new(appointment.id.to_string()));
        row.add_cell(when_cell(appointment.start_at, appointment.status, tz, now));

        let status = Cell::new(appointment.status.to_string());
        row.add_cell(match appointment.status {
            AppointmentStatus::Completed => status.fg(Color::Green),
            AppointmentStatus::Cancelled => status.fg(Color::DarkGrey),
            AppointmentStatus::NoShow => status.fg(Color::Red),
            _ => status,
        });
        row.add_cell(Cell::new(
            appointment
                .original_scheduled_at
                .map(|at| format_in_timezone(at, tz, LOCAL_FORMAT))
                .unwrap_or_default(),
        ));
        table.add_row(row);
    }

    println!("{table}");
}

fn when_cell(
    start_at: DateTime<Utc>,
    status: AppointmentStatus,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Cell {
    let text = format!(
        "{} ({})",
        format_in_timezone(start_at, tz, LOCAL_FORMAT),
        start_at.humanize()
    );
    if status.is_outstanding() && start_at < now {
        Cell::new(text).fg(Color::Red)
    } else {
        Cell::new(text)
    }
}

pub fn display_statistics(stats: &SeriesStatistics, tz: &Tz) {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);

    let rows: Vec<(&str, String)> = vec![
        ("Status", stats.status.to_string()),
        ("Planned", stats.total_planned.to_string()),
        ("Completed", stats.total_completed.to_string()),
        ("Cancelled", stats.total_cancelled.to_string()),
        ("Rescheduled", stats.total_rescheduled.to_string()),
        ("Outstanding", stats.outstanding.to_string()),
        ("Progress", format!("{:.1}%", stats.completion_percentage)),
        ("Payment", stats.payment_status.to_string()),
        ("Paid", format_cents(stats.paid_amount_cents)),
        (
            "Balance due",
            stats
                .balance_due_cents
                .map(format_cents)
                .unwrap_or_else(|| "-".to_string()),
        ),
        (
            "Next appointment",
            stats
                .next_appointment_at
                .map(|at| {
                    format!(
                        "{} ({})",
                        format_in_timezone(at, tz, LOCAL_FORMAT),
                        at.humanize()
                    )
                })
                .unwrap_or_else(|| "-".to_string()),
        ),
    ];
    for (metric, value) in rows {
        table.add_row(vec![Cell::new(metric).add_attribute(Attribute::Bold), Cell::new(value)]);
    }

    println!("{table}");
}

pub fn display_bulk_report(report: &BulkReport, tz: &Tz) {
    let mut table = Table::new();
    table.set_header(vec!["Appointment", "#", "Result"]);

    for result in &report.results {
        let outcome = match &result.outcome {
            TargetOutcome::Completed => Cell::new("completed").fg(Color::Green),
            TargetOutcome::Cancelled => Cell::new("cancelled").fg(Color::Green),
            TargetOutcome::Rescheduled {
                from,
                to,
                auto_resolved,
            } => {
                let mut text = format!(
                    "moved {} -> {}",
                    format_in_timezone(*from, tz, LOCAL_FORMAT),
                    format_in_timezone(*to, tz, LOCAL_FORMAT)
                );
                if *auto_resolved {
                    text.push_str(" (next open slot)");
                }
                Cell::new(text).fg(Color::Green)
            }
            TargetOutcome::Failed(reason) => {
                Cell::new(format!("failed: {}", reason)).fg(Color::Red)
            }
        };
        table.add_row(vec![
            Cell::new(result.appointment_id.to_string()),
            Cell::new(
                result
                    .sequence
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            outcome,
        ]);
    }

    println!("{table}");
}
