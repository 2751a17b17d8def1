//! Occurrence generation.
//!
//! [`OccurrenceGenerator`] turns a [`PatternDefinition`] into civil datetimes in the
//! pattern's timezone. It is pure: "today" is always passed in as `window_start`.
//!
//! Excluded slots (weekends, holidays) are skipped and replaced: they are emitted
//! for display with no sequence number, and generation keeps going until
//! `occurrence_count` accepted slots exist or `end_date` is passed.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::debug;

use crate::error::CoreError;
use crate::holiday::HolidayCalendar;
use crate::models::{
    ExclusionReason, Occurrence, OccurrenceStatus, PatternDefinition, PatternType,
};
use crate::timezone::resolve_local;

/// One generated candidate before it is placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedSlot {
    /// 1-based position among accepted slots; `None` when excluded
    pub sequence: Option<u32>,
    pub scheduled_for: NaiveDateTime,
    pub exclusion: Option<ExclusionReason>,
}

impl GeneratedSlot {
    pub fn is_excluded(&self) -> bool {
        self.exclusion.is_some()
    }

    /// Resolve the slot to instants. Conflicts are left for the detector.
    pub fn to_occurrence(&self, pattern: &PatternDefinition, tz: &Tz) -> Occurrence {
        let start_at = resolve_local(tz, self.scheduled_for);
        Occurrence {
            sequence: self.sequence,
            scheduled_for: self.scheduled_for,
            start_at,
            end_at: start_at + pattern.duration(),
            status: if self.is_excluded() {
                OccurrenceStatus::Excluded
            } else {
                OccurrenceStatus::Available
            },
            exclusion: self.exclusion,
            conflicts: Vec::new(),
        }
    }
}

pub struct OccurrenceGenerator<'a, H: HolidayCalendar + ?Sized> {
    pattern: &'a PatternDefinition,
    holidays: &'a H,
}

impl<'a, H: HolidayCalendar + ?Sized> OccurrenceGenerator<'a, H> {
    pub fn new(pattern: &'a PatternDefinition, holidays: &'a H) -> Self {
        Self { pattern, holidays }
    }

    /// Generates candidates between `window_start` and `window_end` (inclusive civil dates).
    ///
    /// Stops at whichever comes first: `occurrence_count` accepted slots, `end_date`,
    /// `window_end`, `window_start + max_advance_days`, or `max_count` accepted slots
    /// emitted. Accepted slots before `window_start` still consume sequence numbers.
    pub fn generate(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
        max_count: usize,
    ) -> Vec<GeneratedSlot> {
        let last_day = self.last_day(window_start, window_end);
        let mut slots = Vec::new();
        let mut accepted: u32 = 0;
        let mut emitted: usize = 0;
        let mut previous: Option<NaiveDateTime> = None;

        if max_count == 0 {
            return slots;
        }

        for date in candidate_dates(self.pattern, last_day) {
            if let Some(count) = self.pattern.occurrence_count {
                if accepted >= count {
                    break;
                }
            }

            let scheduled_for = date.and_time(self.pattern.preferred_time);
            if previous.is_some_and(|prev| scheduled_for <= prev) {
                continue;
            }
            previous = Some(scheduled_for);

            let exclusion = self.exclusion_for(date);
            let sequence = match exclusion {
                Some(_) => None,
                None => {
                    accepted += 1;
                    Some(accepted)
                }
            };

            if date < window_start {
                continue;
            }

            slots.push(GeneratedSlot {
                sequence,
                scheduled_for,
                exclusion,
            });

            if sequence.is_some() {
                emitted += 1;
                if emitted >= max_count {
                    break;
                }
            }
        }

        debug!(
            pattern_id = %self.pattern.id,
            candidates = slots.len(),
            accepted = emitted,
            %last_day,
            "Generated occurrences"
        );
        slots
    }

    fn last_day(&self, window_start: NaiveDate, window_end: NaiveDate) -> NaiveDate {
        let advance_limit = window_start
            .checked_add_days(Days::new(u64::from(self.pattern.max_advance_days)))
            .unwrap_or(NaiveDate::MAX);
        let mut last = window_end.min(advance_limit);
        if let Some(end_date) = self.pattern.end_date {
            last = last.min(end_date);
        }
        last
    }

    fn exclusion_for(&self, date: NaiveDate) -> Option<ExclusionReason> {
        if self.pattern.exclude_weekends && is_weekend(date) {
            Some(ExclusionReason::Weekend)
        } else if self.pattern.exclude_holidays && self.holidays.is_holiday(date) {
            Some(ExclusionReason::Holiday)
        } else {
            None
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

fn days_in_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Raw candidate dates from `start_date` through `last_day`, before exclusions.
fn candidate_dates<'a>(
    pattern: &'a PatternDefinition,
    last_day: NaiveDate,
) -> Box<dyn Iterator<Item = NaiveDate> + 'a> {
    let start = pattern.start_date;
    match pattern.pattern_type {
        PatternType::Weekly | PatternType::Biweekly => {
            let period = pattern.pattern_type.week_period().unwrap_or(1);
            let anchor = monday_of(start);
            Box::new(
                start
                    .iter_days()
                    .take_while(move |d| *d <= last_day)
                    .filter(move |d| pattern.days_of_week.contains(&d.weekday()))
                    .filter(move |d| {
                        let weeks = (monday_of(*d) - anchor).num_days() / 7;
                        weeks % period == 0
                    }),
            )
        }
        PatternType::Monthly => {
            let first_month = start.with_day(1).unwrap_or(start);
            let months = (0u32..)
                .map_while(move |k| first_month.checked_add_months(Months::new(k)))
                .take_while(move |first| *first <= last_day);
            let in_range = move |d: &NaiveDate| *d >= start && *d <= last_day;
            match (pattern.day_of_month, pattern.week_of_month, pattern.weekday_of_month) {
                (Some(day), _, _) => Box::new(
                    months
                        .filter_map(move |first| first.with_day(day.min(days_in_month(first))))
                        .filter(in_range),
                ),
                (None, Some(week), Some(weekday)) => Box::new(
                    months
                        .filter_map(move |first| {
                            // Months without an Nth weekday are skipped
                            u8::try_from(week).ok().and_then(|n| {
                                NaiveDate::from_weekday_of_month_opt(
                                    first.year(),
                                    first.month(),
                                    weekday,
                                    n,
                                )
                            })
                        })
                        .filter(in_range),
                ),
                _ => Box::new(std::iter::empty()),
            }
        }
        PatternType::Custom => {
            let (Some(interval), Some(anchor)) = (pattern.interval_days, pattern.anchor_date)
            else {
                return Box::new(std::iter::empty());
            };
            if interval == 0 {
                return Box::new(std::iter::empty());
            }
            let step = i64::from(interval);
            let offset = (start - anchor).num_days().rem_euclid(step);
            let lead = (step - offset) % step;
            let first = start.checked_add_days(Days::new(lead.unsigned_abs()));
            Box::new(
                std::iter::successors(first, move |d| {
                    d.checked_add_days(Days::new(u64::from(interval)))
                })
                .take_while(move |d| *d <= last_day),
            )
        }
    }
}

fn rrule_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Renders the pattern as an RFC 5545 `DTSTART` + `RRULE` pair.
///
/// Weekend and holiday exclusions are engine semantics and are not part of the rule.
/// Day-of-month clamping is expressed with `BYSETPOS=-1`.
pub fn to_rrule(pattern: &PatternDefinition) -> Result<String, CoreError> {
    let tz = crate::timezone::parse_timezone(&pattern.timezone)?;
    let first = candidate_dates(pattern, NaiveDate::MAX)
        .next()
        .ok_or_else(|| CoreError::validation("pattern produces no candidate dates"))?;

    let mut parts: Vec<String> = Vec::new();
    match pattern.pattern_type {
        PatternType::Weekly | PatternType::Biweekly => {
            let days: Vec<&str> = pattern
                .days_of_week
                .iter()
                .map(|d| rrule_weekday(*d))
                .collect();
            parts.push("FREQ=WEEKLY".to_string());
            parts.push(format!(
                "INTERVAL={}",
                pattern.pattern_type.week_period().unwrap_or(1)
            ));
            parts.push(format!("BYDAY={}", days.join(",")));
            parts.push("WKST=MO".to_string());
        }
        PatternType::Monthly => {
            parts.push("FREQ=MONTHLY".to_string());
            match (pattern.day_of_month, pattern.week_of_month, pattern.weekday_of_month) {
                (Some(day), _, _) if day > 28 => {
                    let days: Vec<String> = (28..=day).map(|d| d.to_string()).collect();
                    parts.push(format!("BYMONTHDAY={}", days.join(",")));
                    parts.push("BYSETPOS=-1".to_string());
                }
                (Some(day), _, _) => parts.push(format!("BYMONTHDAY={}", day)),
                (None, Some(week), Some(weekday)) => {
                    parts.push(format!("BYDAY={}{}", week, rrule_weekday(weekday)))
                }
                _ => return Err(CoreError::validation("monthly pattern has no day rule")),
            }
        }
        PatternType::Custom => {
            let interval = pattern
                .interval_days
                .ok_or_else(|| CoreError::validation("custom pattern has no interval"))?;
            parts.push("FREQ=DAILY".to_string());
            parts.push(format!("INTERVAL={}", interval));
        }
    }

    if let Some(count) = pattern.occurrence_count {
        parts.push(format!("COUNT={}", count));
    } else if let Some(end_date) = pattern.end_date {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let until = resolve_local(&tz, end_date.and_time(last_second));
        parts.push(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")));
    }

    let dtstart = first.and_time(pattern.preferred_time);
    let dtstart_line = if tz == Tz::UTC {
        format!("DTSTART:{}Z", dtstart.format("%Y%m%dT%H%M%S"))
    } else {
        format!("DTSTART;TZID={}:{}", tz.name(), dtstart.format("%Y%m%dT%H%M%S"))
    };
    let rendered = format!("{}\nRRULE:{}", dtstart_line, parts.join(";"));

    rendered.parse::<RRuleSet>().map_err(|e| {
        CoreError::validation(format!("Failed to render RRULE '{}': {}", rendered, e))
    })?;

    Ok(rendered)
}
