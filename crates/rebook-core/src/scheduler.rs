//! Service facade over the engine.
//!
//! [`Scheduler`] owns the repository, the holiday calendar, the engine limits and the
//! lock registry. Every method is one request: it loads what it needs, runs the pure
//! engine under the relevant locks and persists the result.

use std::collections::BTreeSet;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::bulk::{BulkActionProcessor, BulkReport};
use crate::conflict::ConflictDetector;
use crate::error::CoreError;
use crate::holiday::{HolidayCalendar, NoHolidays};
use crate::lifecycle::SeriesManager;
use crate::locks::{LockKey, LockRegistry};
use crate::models::{
    Appointment, AppointmentStatus, BookedInterval, BulkAction, ConflictDescriptor, EngineConfig,
    NewBooking, NewPattern, Occurrence, OccurrenceStatus, PatternDefinition, Series,
    SeriesCommand, SeriesMetadata, SeriesStatistics, SeriesStatus,
};
use crate::recurrence::OccurrenceGenerator;
use crate::repository::Repository;
use crate::timezone::{end_of_day, parse_timezone};

/// An accepted occurrence that could not be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedOccurrence {
    pub sequence: u32,
    pub scheduled_for: NaiveDateTime,
    pub conflicts: Vec<ConflictDescriptor>,
}

/// Result of confirming a pattern. `series` is `None` when no accepted occurrence
/// could be booked, in which case nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub series: Option<Series>,
    pub appointments: Vec<Appointment>,
    pub rejected: Vec<RejectedOccurrence>,
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        self.series.is_some()
    }
}

pub struct Scheduler<R, H = NoHolidays> {
    repo: R,
    holidays: H,
    config: EngineConfig,
    locks: LockRegistry,
}

impl<R: Repository, H: HolidayCalendar> Scheduler<R, H> {
    pub fn new(repo: R, holidays: H, config: EngineConfig) -> Self {
        Self {
            repo,
            holidays,
            config,
            locks: LockRegistry::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Patterns and preview
    // ------------------------------------------------------------------

    /// Validates and stores a pattern. `today` is the caller's civil date.
    #[instrument(skip(self, data), fields(resource_id = %data.resource_id))]
    pub async fn create_pattern(
        &self,
        data: NewPattern,
        today: NaiveDate,
    ) -> Result<PatternDefinition, CoreError> {
        let pattern = PatternDefinition::create(data, today, &self.config, Utc::now())?;
        self.repo.insert_pattern(&pattern).await?;
        info!(pattern_id = %pattern.id, pattern_type = %pattern.pattern_type, "Created pattern");
        Ok(pattern)
    }

    pub async fn find_pattern(&self, pattern_id: Uuid) -> Result<PatternDefinition, CoreError> {
        self.repo
            .find_pattern_by_id(pattern_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Pattern with id {} not found", pattern_id)))
    }

    /// Generates and annotates candidates without persisting anything.
    ///
    /// `max_count` defaults to the configured preview cap and never exceeds the
    /// generation ceiling.
    #[instrument(skip(self))]
    pub async fn preview_occurrences(
        &self,
        pattern_id: Uuid,
        max_count: Option<usize>,
        window_start: NaiveDate,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let pattern = self.find_pattern(pattern_id).await?;
        let tz = parse_timezone(&pattern.timezone)?;
        let max_count = max_count
            .unwrap_or(self.config.preview_cap)
            .min(self.config.max_generation_cap);

        let occurrences = self.candidates(&pattern, &tz, window_start, max_count);
        let detector = {
            let _guard = self
                .locks
                .acquire([LockKey::Resource(pattern.resource_id.clone())])
                .await;
            self.snapshot(&pattern, &tz, window_start, &occurrences).await?
        };

        Ok(detector.annotate(occurrences, pattern.buffers(), &tz))
    }

    // ------------------------------------------------------------------
    // Confirmation
    // ------------------------------------------------------------------

    /// Books the accepted sequences of a previewed pattern as a new series.
    ///
    /// Conflicting occurrences move to the detector's suggestion when the pattern
    /// allows it and one exists; otherwise they are reported in `rejected`.
    #[instrument(skip(self, accepted, metadata), fields(accepted = accepted.len()))]
    pub async fn confirm_series(
        &self,
        pattern_id: Uuid,
        accepted: &[u32],
        metadata: SeriesMetadata,
        window_start: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Confirmation, CoreError> {
        let wanted: BTreeSet<u32> = accepted.iter().copied().collect();
        if wanted.is_empty() {
            return Err(CoreError::validation("at least one occurrence must be accepted"));
        }
        if wanted.len() != accepted.len() {
            return Err(CoreError::validation("accepted occurrences contain duplicates"));
        }
        if metadata.title.trim().is_empty() {
            return Err(CoreError::validation("series title is required"));
        }

        let pattern = self.find_pattern(pattern_id).await?;
        let tz = parse_timezone(&pattern.timezone)?;
        self.ensure_no_series(pattern_id).await?;

        let _guard = self
            .locks
            .acquire([LockKey::Resource(pattern.resource_id.clone())])
            .await;
        self.ensure_no_series(pattern_id).await?;

        let candidates = self.candidates(
            &pattern,
            &tz,
            window_start,
            self.config.max_generation_cap,
        );
        let chosen: Vec<Occurrence> = candidates
            .into_iter()
            .filter(|o| o.sequence.is_some_and(|s| wanted.contains(&s)))
            .collect();
        let known: BTreeSet<u32> = chosen.iter().filter_map(|o| o.sequence).collect();
        if let Some(unknown) = wanted.difference(&known).next() {
            return Err(CoreError::validation(format!(
                "occurrence {} is not a bookable occurrence of pattern {}",
                unknown, pattern_id
            )));
        }

        let mut detector = self.snapshot(&pattern, &tz, window_start, &chosen).await?;
        let buffers = pattern.buffers();
        let mut booked: Vec<(u32, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>)> =
            Vec::new();
        let mut rejected = Vec::new();

        for occurrence in &chosen {
            let Some(sequence) = occurrence.sequence else {
                continue;
            };
            let conflicts = detector.describe(occurrence.start_at, occurrence.end_at, buffers, &tz);
            let slot = if conflicts.is_empty() {
                Some((occurrence.start_at, occurrence.end_at, None))
            } else {
                match conflicts.first().and_then(|c| c.suggested_resolution) {
                    Some(suggested) if pattern.reschedule_on_conflict => Some((
                        suggested,
                        suggested + pattern.duration(),
                        Some(occurrence.start_at),
                    )),
                    _ => None,
                }
            };

            match slot {
                Some((start_at, end_at, original)) => {
                    if original.is_some() {
                        debug!(sequence, %start_at, "Auto-resolved conflicting occurrence");
                    }
                    detector.add_booking(BookedInterval {
                        appointment_id: Uuid::nil(),
                        series_id: None,
                        resource_id: pattern.resource_id.clone(),
                        start_at,
                        end_at,
                        buffer_before: buffers.before,
                        buffer_after: buffers.after,
                    });
                    booked.push((sequence, start_at, end_at, original));
                }
                None => {
                    warn!(sequence, conflicts = conflicts.len(), "Rejected conflicting occurrence");
                    rejected.push(RejectedOccurrence {
                        sequence,
                        scheduled_for: occurrence.scheduled_for,
                        conflicts,
                    });
                }
            }
        }

        if booked.is_empty() {
            info!(%pattern_id, rejected = rejected.len(), "No occurrence could be booked");
            return Ok(Confirmation {
                series: None,
                appointments: Vec::new(),
                rejected,
            });
        }

        let total_planned = u32::try_from(booked.len())
            .map_err(|_| CoreError::validation("too many accepted occurrences"))?;
        let series = Series::new(&pattern, metadata, total_planned, now);
        let appointments: Vec<Appointment> = booked
            .into_iter()
            .map(|(sequence, start_at, end_at, original)| Appointment {
                id: Uuid::now_v7(),
                series_id: Some(series.id),
                sequence: Some(sequence),
                resource_id: pattern.resource_id.clone(),
                start_at,
                end_at,
                buffer_before: buffers.before,
                buffer_after: buffers.after,
                status: AppointmentStatus::Pending,
                original_scheduled_at: original,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        self.repo.insert_series(&series, &appointments).await?;
        info!(
            series_id = %series.id,
            %pattern_id,
            planned = series.total_planned,
            rejected = rejected.len(),
            "Confirmed series"
        );

        Ok(Confirmation {
            series: Some(series),
            appointments,
            rejected,
        })
    }

    // ------------------------------------------------------------------
    // Series commands
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn series_command(
        &self,
        series_id: Uuid,
        command: SeriesCommand,
        now: DateTime<Utc>,
    ) -> Result<Series, CoreError> {
        let resource_id = self.find_series(series_id).await?.resource_id;
        let _guard = self
            .locks
            .acquire([LockKey::Series(series_id), LockKey::Resource(resource_id)])
            .await;
        let mut manager = self.load_manager(series_id).await?;

        let changed: Vec<Appointment> = match command {
            SeriesCommand::Pause => {
                manager.pause(now)?;
                Vec::new()
            }
            SeriesCommand::Resume => {
                manager.resume(now)?;
                Vec::new()
            }
            SeriesCommand::Cancel => {
                let ids = manager.cancel(now)?;
                manager
                    .appointments()
                    .iter()
                    .filter(|a| ids.contains(&a.id))
                    .cloned()
                    .collect()
            }
        };

        let saved = self.repo.save_series(manager.series(), &changed).await?;
        info!(%series_id, %command, status = %saved.status, "Applied series command");
        Ok(saved)
    }

    /// Complete, cancel or reschedule one or more appointments.
    pub async fn appointment_command(
        &self,
        action: BulkAction,
        appointment_ids: &[Uuid],
        apply_to_remaining_series: bool,
        now: DateTime<Utc>,
    ) -> Result<BulkReport, CoreError> {
        BulkActionProcessor::new(&self.repo, &self.locks)
            .apply(action, appointment_ids, apply_to_remaining_series, now)
            .await
    }

    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        series_id: Uuid,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> Result<Series, CoreError> {
        let _guard = self.locks.acquire([LockKey::Series(series_id)]).await;
        let mut manager = self.load_manager(series_id).await?;
        manager.record_payment(amount_cents, now)?;
        let saved = self.repo.save_series(manager.series(), &[]).await?;
        info!(%series_id, payment_status = %saved.payment_status, "Recorded payment");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn refund(&self, series_id: Uuid, now: DateTime<Utc>) -> Result<Series, CoreError> {
        let _guard = self.locks.acquire([LockKey::Series(series_id)]).await;
        let mut manager = self.load_manager(series_id).await?;
        manager.refund(now)?;
        self.repo.save_series(manager.series(), &[]).await
    }

    /// Recounts the series from its appointments and saves it if anything drifted.
    #[instrument(skip(self))]
    pub async fn reconcile_series(
        &self,
        series_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Series, CoreError> {
        let _guard = self.locks.acquire([LockKey::Series(series_id)]).await;
        let mut manager = self.load_manager(series_id).await?;
        if manager.reconcile(now)? {
            self.repo.save_series(manager.series(), &[]).await
        } else {
            Ok(manager.series().clone())
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn find_series(&self, series_id: Uuid) -> Result<Series, CoreError> {
        self.repo
            .find_series_by_id(series_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Series with id {} not found", series_id)))
    }

    pub async fn list_series(
        &self,
        status: Option<SeriesStatus>,
    ) -> Result<Vec<Series>, CoreError> {
        self.repo.find_series_by_status(status).await
    }

    pub async fn series_appointments(
        &self,
        series_id: Uuid,
    ) -> Result<Vec<Appointment>, CoreError> {
        self.find_series(series_id).await?;
        self.repo.find_appointments_for_series(series_id).await
    }

    pub async fn series_statistics(
        &self,
        series_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SeriesStatistics, CoreError> {
        Ok(self.load_manager(series_id).await?.statistics(now))
    }

    // ------------------------------------------------------------------
    // Standalone bookings
    // ------------------------------------------------------------------

    /// Books an appointment outside any series. Rejected if it overlaps an existing booking.
    #[instrument(skip(self, booking), fields(resource_id = %booking.resource_id))]
    pub async fn add_booking(&self, booking: NewBooking) -> Result<Appointment, CoreError> {
        if booking.resource_id.trim().is_empty() {
            return Err(CoreError::validation("resource_id is required"));
        }
        if booking.end_at <= booking.start_at {
            return Err(CoreError::validation("booking must end after it starts"));
        }

        let _guard = self
            .locks
            .acquire([LockKey::Resource(booking.resource_id.clone())])
            .await;
        let (window_start, window_end) = booking.buffers.pad(booking.start_at, booking.end_at);
        let existing = self
            .repo
            .bookings_for(&booking.resource_id, window_start, window_end)
            .await?;
        let detector = ConflictDetector::new(booking.resource_id.clone(), existing);
        let overlapping = detector.overlapping(booking.start_at, booking.end_at, booking.buffers);
        if let Some(first) = overlapping.first() {
            return Err(CoreError::validation(format!(
                "booking overlaps appointment {} ({} - {})",
                first.appointment_id, first.start_at, first.end_at
            )));
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::now_v7(),
            series_id: None,
            sequence: None,
            resource_id: booking.resource_id,
            start_at: booking.start_at,
            end_at: booking.end_at,
            buffer_before: booking.buffers.before,
            buffer_after: booking.buffers.after,
            status: AppointmentStatus::Confirmed,
            original_scheduled_at: None,
            notes: booking.notes,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_appointment(&appointment).await?;
        info!(appointment_id = %appointment.id, "Added standalone booking");
        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn horizon(pattern: &PatternDefinition, window_start: NaiveDate) -> NaiveDate {
        window_start
            .checked_add_days(Days::new(u64::from(pattern.max_advance_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    fn candidates(
        &self,
        pattern: &PatternDefinition,
        tz: &Tz,
        window_start: NaiveDate,
        max_count: usize,
    ) -> Vec<Occurrence> {
        OccurrenceGenerator::new(pattern, &self.holidays)
            .generate(window_start, Self::horizon(pattern, window_start), max_count)
            .iter()
            .map(|slot| slot.to_occurrence(pattern, tz))
            .collect()
    }

    /// Bookings around the candidates, read once. Callers hold the resource lock.
    async fn snapshot(
        &self,
        pattern: &PatternDefinition,
        tz: &Tz,
        window_start: NaiveDate,
        occurrences: &[Occurrence],
    ) -> Result<ConflictDetector, CoreError> {
        let horizon = end_of_day(tz, Self::horizon(pattern, window_start));
        let live = occurrences
            .iter()
            .filter(|o| o.status != OccurrenceStatus::Excluded);
        let start = live.clone().map(|o| o.start_at).min();
        let end = live.map(|o| o.end_at).max();

        let bookings = match (start, end) {
            (Some(start), Some(end)) => {
                self.repo
                    .bookings_for(
                        &pattern.resource_id,
                        start - Duration::days(1),
                        end + Duration::days(2),
                    )
                    .await?
            }
            _ => Vec::new(),
        };
        Ok(ConflictDetector::new(pattern.resource_id.clone(), bookings).with_horizon(horizon))
    }

    async fn ensure_no_series(&self, pattern_id: Uuid) -> Result<(), CoreError> {
        match self.repo.find_series_by_pattern(pattern_id).await? {
            Some(existing) => Err(CoreError::StateConflict {
                series_id: existing.id,
                status: existing.status,
                command: "confirm another series from the pattern of",
            }),
            None => Ok(()),
        }
    }

    async fn load_manager(&self, series_id: Uuid) -> Result<SeriesManager, CoreError> {
        let series = self.find_series(series_id).await?;
        let appointments = self.repo.find_appointments_for_series(series_id).await?;
        Ok(SeriesManager::new(series, appointments))
    }
}
