//! Validation and construction of recurrence patterns.
//!
//! A [`NewPattern`] is checked as a whole and every problem is reported in a
//! single [`CoreError::Validation`], so a form can show all of them at once.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{EngineConfig, NewPattern, PatternDefinition, PatternType};
use crate::timezone::parse_timezone;

const MINUTES_PER_DAY: u32 = 24 * 60;
/// Upper bound for a single generation pass, roughly ten years.
pub const MAX_ADVANCE_DAYS: u32 = 3660;

impl NewPattern {
    /// Checks every structural rule of the pattern against `today`, the caller's civil date.
    pub fn validate(&self, today: NaiveDate) -> Result<(), CoreError> {
        parse_timezone(&self.timezone)?;

        let mut problems: Vec<String> = Vec::new();

        if self.resource_id.trim().is_empty() {
            problems.push("resource_id is required".to_string());
        }
        if self.duration_minutes == 0 {
            problems.push("duration_minutes must be greater than zero".to_string());
        } else if self.duration_minutes > MINUTES_PER_DAY {
            problems.push("duration_minutes cannot exceed one day".to_string());
        }
        if self.start_date < today {
            problems.push(format!(
                "start_date {} is before the creation date {}",
                self.start_date, today
            ));
        }

        match (self.end_date, self.occurrence_count) {
            (Some(_), Some(_)) => {
                problems.push("end_date and occurrence_count are mutually exclusive".to_string())
            }
            (None, None) => {
                problems.push("one of end_date or occurrence_count is required".to_string())
            }
            (Some(end), None) if end < self.start_date => {
                problems.push("end_date cannot be before start_date".to_string())
            }
            (None, Some(0)) => problems.push("occurrence_count must be at least 1".to_string()),
            _ => {}
        }

        let has_monthly_fields = self.day_of_month.is_some()
            || self.week_of_month.is_some()
            || self.weekday_of_month.is_some();
        let has_custom_fields = self.interval_days.is_some() || self.anchor_date.is_some();

        match self.pattern_type {
            PatternType::Weekly | PatternType::Biweekly => {
                if self.days_of_week.is_empty() {
                    problems.push(format!(
                        "{} patterns need at least one day of week",
                        self.pattern_type
                    ));
                }
                if has_monthly_fields || has_custom_fields {
                    problems.push(format!(
                        "{} patterns cannot set monthly or custom fields",
                        self.pattern_type
                    ));
                }
                if self.exclude_weekends
                    && !self.days_of_week.is_empty()
                    && self
                        .days_of_week
                        .iter()
                        .all(|d| matches!(d, Weekday::Sat | Weekday::Sun))
                {
                    problems.push("every selected day is an excluded weekend day".to_string());
                }
            }
            PatternType::Monthly => {
                self.validate_monthly(&mut problems);
                if !self.days_of_week.is_empty() || has_custom_fields {
                    problems.push(
                        "monthly patterns cannot set days_of_week or custom fields".to_string(),
                    );
                }
            }
            PatternType::Custom => {
                match self.interval_days {
                    None => problems.push("custom patterns require interval_days".to_string()),
                    Some(0) => problems.push("interval_days must be at least 1".to_string()),
                    Some(_) => {}
                }
                if self.anchor_date.is_none() {
                    problems.push("custom patterns require anchor_date".to_string());
                }
                if !self.days_of_week.is_empty() || has_monthly_fields {
                    problems.push(
                        "custom patterns cannot set days_of_week or monthly fields".to_string(),
                    );
                }
            }
        }

        match self.max_advance_days {
            Some(0) => problems.push("max_advance_days must be at least 1".to_string()),
            Some(days) if days > MAX_ADVANCE_DAYS => problems.push(format!(
                "max_advance_days cannot exceed {}",
                MAX_ADVANCE_DAYS
            )),
            _ => {}
        }
        if self.buffer_before > MINUTES_PER_DAY || self.buffer_after > MINUTES_PER_DAY {
            problems.push("buffers cannot exceed one day".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CoreError::validation(problems.join("; ")))
        }
    }

    fn validate_monthly(&self, problems: &mut Vec<String>) {
        let by_ordinal = self.week_of_month.is_some() || self.weekday_of_month.is_some();
        match (self.day_of_month, by_ordinal) {
            (Some(_), true) => problems.push(
                "day_of_month and week_of_month/weekday_of_month are mutually exclusive"
                    .to_string(),
            ),
            (None, false) => problems.push(
                "monthly patterns require day_of_month or week_of_month with weekday_of_month"
                    .to_string(),
            ),
            (Some(day), false) if !(1..=31).contains(&day) => {
                problems.push("day_of_month must be between 1 and 31".to_string())
            }
            (None, true) => {
                match self.week_of_month {
                    None => problems
                        .push("week_of_month is required with weekday_of_month".to_string()),
                    Some(week) if !(1..=4).contains(&week) => {
                        problems.push("week_of_month must be between 1 and 4".to_string())
                    }
                    Some(_) => {}
                }
                if self.weekday_of_month.is_none() {
                    problems.push("weekday_of_month is required with week_of_month".to_string());
                }
            }
            _ => {}
        }
    }
}

impl PatternDefinition {
    /// Validates `data` and turns it into a stored definition with a fresh id.
    pub fn create(
        data: NewPattern,
        today: NaiveDate,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        data.validate(today)?;

        let mut days_of_week = data.days_of_week;
        days_of_week.sort_by_key(Weekday::num_days_from_monday);
        days_of_week.dedup();

        Ok(Self {
            id: Uuid::now_v7(),
            resource_id: data.resource_id.trim().to_string(),
            pattern_type: data.pattern_type,
            preferred_time: data.preferred_time,
            duration_minutes: data.duration_minutes,
            start_date: data.start_date,
            end_date: data.end_date,
            occurrence_count: data.occurrence_count,
            days_of_week,
            day_of_month: data.day_of_month,
            week_of_month: data.week_of_month,
            weekday_of_month: data.weekday_of_month,
            interval_days: data.interval_days,
            anchor_date: data.anchor_date,
            exclude_holidays: data.exclude_holidays,
            exclude_weekends: data.exclude_weekends,
            reschedule_on_conflict: data.reschedule_on_conflict,
            max_advance_days: data
                .max_advance_days
                .unwrap_or(config.default_max_advance_days),
            buffer_before: data.buffer_before,
            buffer_after: data.buffer_after,
            timezone: data.timezone,
            created_at: now,
        })
    }
}
