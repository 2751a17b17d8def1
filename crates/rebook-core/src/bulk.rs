//! Applies one appointment command across many targets.
//!
//! Targets are grouped by series. Each group runs under the series and resource locks
//! against a freshly loaded aggregate and a single bookings snapshot, in ascending
//! sequence order. Every target succeeds or fails on its own; the caller gets a
//! [`BulkReport`] rather than an all-or-nothing result.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Days, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::conflict::ConflictDetector;
use crate::error::CoreError;
use crate::lifecycle::SeriesManager;
use crate::locks::{LockKey, LockRegistry};
use crate::models::{
    Appointment, BookedInterval, Buffers, BulkAction, ConflictDescriptor, RescheduleTo,
};
use crate::repository::Repository;
use crate::timezone::{parse_timezone, resolve_local};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FailureReason {
    NotFound,
    /// The appointment is a standalone booking
    NotInSeries,
    StateConflict(String),
    Conflict(Vec<ConflictDescriptor>),
    Invalid(String),
    Persistence(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotFound => write!(f, "appointment not found"),
            FailureReason::NotInSeries => write!(f, "appointment does not belong to a series"),
            FailureReason::StateConflict(message) => write!(f, "{}", message),
            FailureReason::Conflict(conflicts) => {
                write!(f, "conflicts with {} existing booking(s)", conflicts.len())
            }
            FailureReason::Invalid(message) => write!(f, "{}", message),
            FailureReason::Persistence(message) => write!(f, "could not save: {}", message),
        }
    }
}

impl From<CoreError> for FailureReason {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::NotFound(_) => FailureReason::NotFound,
            CoreError::StateConflict { .. } => FailureReason::StateConflict(error.to_string()),
            CoreError::Validation(message) | CoreError::InvariantViolation(message) => {
                FailureReason::Invalid(message)
            }
            other => FailureReason::Persistence(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOutcome {
    Completed,
    Cancelled,
    Rescheduled {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        /// The requested slot was taken and the detector's suggestion was used instead
        auto_resolved: bool,
    },
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResult {
    pub appointment_id: Uuid,
    pub series_id: Option<Uuid>,
    pub sequence: Option<u32>,
    pub outcome: TargetOutcome,
}

impl TargetResult {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, TargetOutcome::Failed(_))
    }

    fn failed(appointment_id: Uuid, reason: FailureReason) -> Self {
        Self {
            appointment_id,
            series_id: None,
            sequence: None,
            outcome: TargetOutcome::Failed(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub action: BulkAction,
    pub results: Vec<TargetResult>,
}

impl BulkReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn result_for(&self, appointment_id: Uuid) -> Option<&TargetResult> {
        self.results
            .iter()
            .find(|r| r.appointment_id == appointment_id)
    }
}

pub struct BulkActionProcessor<'a, R: Repository + ?Sized> {
    repo: &'a R,
    locks: &'a LockRegistry,
}

impl<'a, R: Repository + ?Sized> BulkActionProcessor<'a, R> {
    pub fn new(repo: &'a R, locks: &'a LockRegistry) -> Self {
        Self { repo, locks }
    }

    /// Applies `action` to `appointment_ids`, or with `apply_to_remaining_series` to every
    /// outstanding appointment from the earliest selected sequence onward.
    ///
    /// Only malformed requests return `Err`; per-target problems are in the report.
    #[instrument(skip(self, appointment_ids), fields(targets = appointment_ids.len()))]
    pub async fn apply(
        &self,
        action: BulkAction,
        appointment_ids: &[Uuid],
        apply_to_remaining_series: bool,
        now: DateTime<Utc>,
    ) -> Result<BulkReport, CoreError> {
        if appointment_ids.is_empty() {
            return Err(CoreError::validation("at least one appointment id is required"));
        }
        let exact_time = matches!(action, BulkAction::Reschedule(RescheduleTo::At(_)));
        if exact_time && (appointment_ids.len() > 1 || apply_to_remaining_series) {
            return Err(CoreError::validation(
                "an exact reschedule time applies to a single appointment, \
                 use a day shift for several",
            ));
        }

        let requested: Vec<Uuid> = {
            let mut seen = BTreeSet::new();
            appointment_ids
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect()
        };
        let found = self.repo.find_appointments_by_ids(&requested).await?;

        let mut results = Vec::new();
        let mut by_series: BTreeMap<Uuid, (String, Vec<Uuid>)> = BTreeMap::new();
        for id in &requested {
            let Some(appointment) = found.iter().find(|a| a.id == *id) else {
                results.push(TargetResult::failed(*id, FailureReason::NotFound));
                continue;
            };
            match appointment.series_id {
                None => results.push(TargetResult::failed(*id, FailureReason::NotInSeries)),
                Some(series_id) => by_series
                    .entry(series_id)
                    .or_insert_with(|| (appointment.resource_id.clone(), Vec::new()))
                    .1
                    .push(*id),
            }
        }

        for (series_id, (resource_id, selected)) in by_series {
            let group = self
                .apply_to_series(
                    &action,
                    series_id,
                    &resource_id,
                    &selected,
                    apply_to_remaining_series,
                    now,
                )
                .await;
            match group {
                Ok(group_results) => results.extend(group_results),
                Err(error) => {
                    warn!(%series_id, %error, "Bulk action failed for series");
                    let reason = FailureReason::from(error);
                    results.extend(selected.iter().map(|id| TargetResult {
                        series_id: Some(series_id),
                        ..TargetResult::failed(*id, reason.clone())
                    }));
                }
            }
        }

        let report = BulkReport { action, results };
        info!(
            action = %report.action,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Bulk action applied"
        );
        Ok(report)
    }

    async fn apply_to_series(
        &self,
        action: &BulkAction,
        series_id: Uuid,
        resource_id: &str,
        selected: &[Uuid],
        apply_to_remaining_series: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<TargetResult>, CoreError> {
        let _guard = self
            .locks
            .acquire([
                LockKey::Series(series_id),
                LockKey::Resource(resource_id.to_string()),
            ])
            .await;

        // Everything below reads state committed before the locks were taken
        let series = self
            .repo
            .find_series_by_id(series_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Series with id {} not found", series_id)))?;
        let pattern = self
            .repo
            .find_pattern_by_id(series.pattern_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Pattern with id {} not found", series.pattern_id))
            })?;
        let tz = parse_timezone(&pattern.timezone)?;
        let appointments = self.repo.find_appointments_for_series(series_id).await?;
        let mut manager = SeriesManager::new(series, appointments);

        let targets = expand_targets(manager.appointments(), selected, apply_to_remaining_series);

        let plan = match action {
            BulkAction::Reschedule(to) => {
                let moves: Vec<(DateTime<Utc>, DateTime<Utc>)> = targets
                    .iter()
                    .filter_map(|id| manager.appointment(*id))
                    .filter_map(|a| new_slot(a, *to, &tz))
                    .collect();
                let horizon = now
                    + Duration::days(i64::from(pattern.max_advance_days))
                    + Duration::days(1);
                let bookings = match snapshot_window(&moves) {
                    Some((window_start, window_end)) => {
                        self.repo
                            .bookings_for(resource_id, window_start, window_end)
                            .await?
                    }
                    None => Vec::new(),
                };
                let detector = ConflictDetector::new(resource_id, bookings).with_horizon(horizon);
                plan_reschedules(
                    &manager,
                    &targets,
                    *to,
                    detector,
                    pattern.reschedule_on_conflict,
                    &tz,
                )
            }
            _ => ReschedulePlan::new(),
        };

        let mut results = Vec::with_capacity(targets.len());
        for id in targets {
            let (outcome, next) = self
                .apply_one(action, &manager, id, plan.get(&id), now)
                .await;
            if let Some(next) = next {
                manager = next;
            }
            if let TargetOutcome::Failed(reason) = &outcome {
                warn!(%series_id, appointment_id = %id, %reason, "Bulk target failed");
            }
            results.push(TargetResult {
                appointment_id: id,
                series_id: Some(series_id),
                sequence: manager.appointment(id).and_then(|a| a.sequence),
                outcome,
            });
        }
        Ok(results)
    }

    /// Runs one target against a copy of the aggregate and persists it. Returns the
    /// outcome and, on success, the aggregate to continue from.
    async fn apply_one(
        &self,
        action: &BulkAction,
        manager: &SeriesManager,
        appointment_id: Uuid,
        planned: Option<&Result<PlannedMove, FailureReason>>,
        now: DateTime<Utc>,
    ) -> (TargetOutcome, Option<SeriesManager>) {
        let mut draft = manager.clone();

        let step = match action {
            BulkAction::Complete => draft
                .complete_occurrence(appointment_id, now)
                .map(|_| TargetOutcome::Completed),
            BulkAction::Cancel => draft
                .cancel_occurrence(appointment_id, now)
                .map(|_| TargetOutcome::Cancelled),
            BulkAction::Reschedule(_) => match planned {
                Some(Ok(planned)) => draft
                    .reschedule_occurrence(appointment_id, planned.start, planned.end, now)
                    .map(|_| TargetOutcome::Rescheduled {
                        from: planned.from,
                        to: planned.start,
                        auto_resolved: planned.auto_resolved,
                    }),
                Some(Err(reason)) => return (TargetOutcome::Failed(reason.clone()), None),
                None => return (TargetOutcome::Failed(FailureReason::NotFound), None),
            },
        };

        let outcome = match step {
            Ok(outcome) => outcome,
            Err(error) => return (TargetOutcome::Failed(error.into()), None),
        };

        let Some(changed) = draft.appointment(appointment_id).cloned() else {
            return (TargetOutcome::Failed(FailureReason::NotFound), None);
        };
        match self.repo.save_series(draft.series(), &[changed]).await {
            Ok(saved) => {
                let (_, appointments) = draft.into_parts();
                (outcome, Some(SeriesManager::new(saved, appointments)))
            }
            Err(error) => {
                let reason = match error {
                    CoreError::ConcurrentModification(_) => {
                        FailureReason::StateConflict(error.to_string())
                    }
                    other => FailureReason::Persistence(other.to_string()),
                };
                (TargetOutcome::Failed(reason), None)
            }
        }
    }
}

/// Where one reschedule target is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// The requested slot was taken and the detector's suggestion is used instead
    pub auto_resolved: bool,
}

pub type ReschedulePlan = BTreeMap<Uuid, Result<PlannedMove, FailureReason>>;

/// Decides every move of one reschedule command before anything is saved.
///
/// Slots held by the targets themselves are vacated first, so a series shifted onto its
/// own later dates does not collide with itself. A target that cannot move keeps its
/// old slot, and any move planned onto that slot fails in turn.
pub fn plan_reschedules(
    manager: &SeriesManager,
    targets: &[Uuid],
    to: RescheduleTo,
    mut detector: ConflictDetector,
    reschedule_on_conflict: bool,
    tz: &Tz,
) -> ReschedulePlan {
    let mut vacated: BTreeMap<Uuid, BookedInterval> = targets
        .iter()
        .filter_map(|id| detector.remove_booking(*id).map(|booking| (*id, booking)))
        .collect();

    let mut plan = ReschedulePlan::new();
    for id in targets {
        let decision = place(manager, *id, to, &mut detector, reschedule_on_conflict, tz);
        plan.insert(*id, decision);
    }

    let mut staying: Vec<Uuid> = plan
        .iter()
        .filter(|(_, decision)| decision.is_err())
        .map(|(id, _)| *id)
        .collect();
    while let Some(id) = staying.pop() {
        let Some(booking) = vacated.remove(&id) else {
            continue;
        };
        detector.add_booking(booking);
        for (other, decision) in plan.iter_mut() {
            let Some(planned) = decision.as_ref().ok().copied() else {
                continue;
            };
            let Some(moved) = detector.remove_booking(*other) else {
                continue;
            };
            let buffers = Buffers {
                before: moved.buffer_before,
                after: moved.buffer_after,
            };
            let conflicts = detector.describe(planned.start, planned.end, buffers, tz);
            if conflicts.is_empty() {
                detector.add_booking(moved);
            } else {
                *decision = Err(FailureReason::Conflict(conflicts));
                staying.push(*other);
            }
        }
    }
    plan
}

/// Places one target on the detector's timeline, or says why it cannot move.
fn place(
    manager: &SeriesManager,
    appointment_id: Uuid,
    to: RescheduleTo,
    detector: &mut ConflictDetector,
    reschedule_on_conflict: bool,
    tz: &Tz,
) -> Result<PlannedMove, FailureReason> {
    let current = manager.ensure_outstanding(appointment_id, "reschedule an occurrence of")?;
    let (start, end) = new_slot(current, to, tz)
        .ok_or_else(|| FailureReason::Invalid("new slot is out of range".to_string()))?;

    let conflicts = detector.describe(start, end, current.buffers(), tz);
    let planned = if conflicts.is_empty() {
        PlannedMove {
            from: current.start_at,
            start,
            end,
            auto_resolved: false,
        }
    } else {
        match conflicts.first().and_then(|c| c.suggested_resolution) {
            Some(suggested) if reschedule_on_conflict => PlannedMove {
                from: current.start_at,
                start: suggested,
                end: suggested + (end - start),
                auto_resolved: true,
            },
            _ => return Err(FailureReason::Conflict(conflicts)),
        }
    };

    detector.add_booking(BookedInterval {
        start_at: planned.start,
        end_at: planned.end,
        ..current.as_booking()
    });
    Ok(planned)
}

/// The explicit selection, widened with `forward` to every outstanding appointment at or
/// after the earliest selected sequence. Ascending sequence order.
pub fn expand_targets(
    appointments: &[Appointment],
    selected: &[Uuid],
    forward: bool,
) -> Vec<Uuid> {
    let chosen: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| selected.contains(&a.id))
        .collect();

    let mut targets: Vec<&Appointment> = chosen.clone();
    if forward {
        if let Some(min_sequence) = chosen.iter().filter_map(|a| a.sequence).min() {
            targets.extend(appointments.iter().filter(|a| {
                a.status.is_outstanding() && a.sequence.is_some_and(|s| s >= min_sequence)
            }));
        }
    }

    targets.sort_by_key(|a| (a.sequence, a.start_at));
    targets.dedup_by_key(|a| a.id);
    targets.into_iter().map(|a| a.id).collect()
}

/// Where `appointment` lands under `to`, keeping its length.
pub fn new_slot(
    appointment: &Appointment,
    to: RescheduleTo,
    tz: &Tz,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let length = appointment.end_at - appointment.start_at;
    let local = match to {
        RescheduleTo::At(local) => local,
        RescheduleTo::Shift { days, time } => {
            let current = appointment.start_at.with_timezone(tz).naive_local();
            let date = if days >= 0 {
                current.date().checked_add_days(Days::new(days.unsigned_abs()))?
            } else {
                current.date().checked_sub_days(Days::new(days.unsigned_abs()))?
            };
            date.and_time(time.unwrap_or(current.time()))
        }
    };
    let start = resolve_local(tz, local);
    Some((start, start + length))
}

/// Covers every requested slot plus a day either side, so same-day suggestions and
/// buffered neighbours are in the snapshot.
fn snapshot_window(
    moves: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = moves.iter().map(|(start, _)| *start).min()?;
    let end = moves.iter().map(|(_, end)| *end).max()?;
    Some((start - Duration::days(1), end + Duration::days(2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AppointmentStatus, PaymentStatus, PaymentType, Series, SeriesStatus,
    };
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn appointment(sequence: u32, status: AppointmentStatus) -> Appointment {
        let start = Utc.with_ymd_and_hms(2025, 3, 4, 14, 0, 0).unwrap()
            + Duration::weeks(i64::from(sequence) - 1);
        Appointment {
            id: Uuid::now_v7(),
            series_id: Some(Uuid::nil()),
            sequence: Some(sequence),
            resource_id: "barber-1".to_string(),
            start_at: start,
            end_at: start + Duration::minutes(45),
            buffer_before: 0,
            buffer_after: 0,
            status,
            original_scheduled_at: None,
            notes: None,
            created_at: start,
            updated_at: start,
        }
    }

    fn series() -> Vec<Appointment> {
        vec![
            appointment(1, AppointmentStatus::Completed),
            appointment(2, AppointmentStatus::Pending),
            appointment(3, AppointmentStatus::Cancelled),
            appointment(4, AppointmentStatus::Confirmed),
            appointment(5, AppointmentStatus::Pending),
        ]
    }

    fn manager_of(appointments: Vec<Appointment>) -> SeriesManager {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let count = |status: AppointmentStatus| {
            appointments.iter().filter(|a| a.status == status).count() as u32
        };
        let series = Series {
            id: Uuid::nil(),
            pattern_id: Uuid::nil(),
            resource_id: "barber-1".to_string(),
            title: "Weekly trim".to_string(),
            client_name: None,
            notes: None,
            status: SeriesStatus::Active,
            total_planned: appointments.len() as u32,
            total_completed: count(AppointmentStatus::Completed),
            total_cancelled: count(AppointmentStatus::Cancelled),
            total_rescheduled: 0,
            payment_type: PaymentType::PerAppointment,
            payment_status: PaymentStatus::Pending,
            paid_amount_cents: 0,
            total_series_price_cents: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        SeriesManager::new(series, appointments)
    }

    fn weekly_pending(count: u32) -> SeriesManager {
        manager_of(
            (1..=count)
                .map(|sequence| appointment(sequence, AppointmentStatus::Pending))
                .collect(),
        )
    }

    fn detector_for(manager: &SeriesManager, extra: Vec<BookedInterval>) -> ConflictDetector {
        let mut bookings: Vec<BookedInterval> = manager
            .appointments()
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .map(|a| a.as_booking())
            .collect();
        bookings.extend(extra);
        ConflictDetector::new("barber-1", bookings)
    }

    fn external(start: DateTime<Utc>) -> BookedInterval {
        BookedInterval {
            appointment_id: Uuid::now_v7(),
            series_id: None,
            resource_id: "barber-1".to_string(),
            start_at: start,
            end_at: start + Duration::minutes(30),
            buffer_before: 0,
            buffer_after: 0,
        }
    }

    const NEXT_WEEK: RescheduleTo = RescheduleTo::Shift {
        days: 7,
        time: None,
    };

    #[test]
    fn test_weekly_series_shifts_onto_its_own_later_slots() {
        let manager = weekly_pending(4);
        let targets: Vec<Uuid> = manager.appointments().iter().map(|a| a.id).collect();
        let detector = detector_for(&manager, Vec::new());

        let plan = plan_reschedules(&manager, &targets, NEXT_WEEK, detector, false, &Tz::UTC);

        for appointment in manager.appointments() {
            let planned = plan[&appointment.id].as_ref().unwrap();
            assert_eq!(planned.from, appointment.start_at);
            assert_eq!(planned.start, appointment.start_at + Duration::weeks(1));
            assert!(!planned.auto_resolved);
        }
    }

    #[test]
    fn test_blocked_target_keeps_its_slot_for_earlier_moves() {
        let manager = weekly_pending(4);
        let targets: Vec<Uuid> = manager.appointments().iter().map(|a| a.id).collect();
        let last = &manager.appointments()[3];
        let blocker = external(last.start_at + Duration::weeks(1));
        let detector = detector_for(&manager, vec![blocker.clone()]);

        let plan = plan_reschedules(&manager, &targets, NEXT_WEEK, detector, false, &Tz::UTC);

        // The last one is blocked, so it stays and every earlier move lands on a kept slot
        match &plan[&last.id] {
            Err(FailureReason::Conflict(conflicts)) => {
                assert_eq!(conflicts[0].conflicting_appointment_id, blocker.appointment_id)
            }
            other => panic!("expected a conflict, got {:?}", other),
        }
        let third = &manager.appointments()[2];
        match &plan[&third.id] {
            Err(FailureReason::Conflict(conflicts)) => {
                assert_eq!(conflicts[0].conflicting_appointment_id, last.id)
            }
            other => panic!("expected a conflict, got {:?}", other),
        }
        assert!(plan.values().all(|decision| decision.is_err()));
    }

    #[test]
    fn test_completed_target_is_not_vacated() {
        let manager = manager_of(vec![
            appointment(1, AppointmentStatus::Pending),
            appointment(2, AppointmentStatus::Completed),
            appointment(3, AppointmentStatus::Pending),
        ]);
        let all: Vec<Uuid> = manager.appointments().iter().map(|a| a.id).collect();
        let detector = detector_for(&manager, Vec::new());

        let plan = plan_reschedules(&manager, &all, NEXT_WEEK, detector, false, &Tz::UTC);

        assert!(matches!(plan[&all[1]], Err(FailureReason::Invalid(_))));
        assert!(matches!(plan[&all[0]], Err(FailureReason::Conflict(_))));
        assert!(plan[&all[2]].is_ok());
    }

    #[test]
    fn test_auto_resolve_moves_later_the_same_day() {
        let manager = manager_of(vec![appointment(1, AppointmentStatus::Pending)]);
        let only = manager.appointments()[0].clone();
        let blocker = external(only.start_at + Duration::weeks(1));
        let detector = detector_for(&manager, vec![blocker]);

        let plan = plan_reschedules(&manager, &[only.id], NEXT_WEEK, detector, true, &Tz::UTC);

        let planned = plan[&only.id].as_ref().unwrap();
        assert!(planned.auto_resolved);
        assert_eq!(planned.start, only.start_at + Duration::weeks(1) + Duration::minutes(45));
        assert_eq!(planned.end - planned.start, Duration::minutes(45));
    }

    #[test]
    fn test_expand_forward_from_earliest_selection() {
        let appointments = series();
        let selected = vec![appointments[4].id, appointments[1].id];

        let explicit = expand_targets(&appointments, &selected, false);
        assert_eq!(explicit, vec![appointments[1].id, appointments[4].id]);

        let forward = expand_targets(&appointments, &selected, true);
        assert_eq!(
            forward,
            vec![appointments[1].id, appointments[3].id, appointments[4].id]
        );
    }

    #[test]
    fn test_expand_keeps_explicit_non_outstanding_targets() {
        let appointments = series();
        let selected = vec![appointments[0].id];
        let forward = expand_targets(&appointments, &selected, true);
        // The completed one stays so its failure is reported; sequence 3 is skipped
        assert_eq!(
            forward,
            vec![
                appointments[0].id,
                appointments[1].id,
                appointments[3].id,
                appointments[4].id
            ]
        );
    }

    #[test]
    fn test_new_slot_shift_and_time() {
        let tz: Tz = "Europe/Paris".parse().unwrap();
        let appt = appointment(1, AppointmentStatus::Pending);
        // 14:00 UTC is 15:00 in Paris in March (before DST)
        let (start, end) = new_slot(
            &appt,
            RescheduleTo::Shift {
                days: 2,
                time: Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
            },
            &tz,
        )
        .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 6, 9, 0, 0).unwrap());
        assert_eq!(end - start, Duration::minutes(45));

        let (kept_time, _) =
            new_slot(&appt, RescheduleTo::Shift { days: -1, time: None }, &tz).unwrap();
        assert_eq!(kept_time, Utc.with_ymd_and_hms(2025, 3, 3, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_new_slot_exact_time() {
        let appt = appointment(1, AppointmentStatus::Pending);
        let at = NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap();
        let (start, _) = new_slot(&appt, RescheduleTo::At(at), &Tz::UTC).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 5, 16, 30, 0).unwrap());
    }

    #[test]
    fn test_failure_reason_from_core_error() {
        let reason = FailureReason::from(CoreError::StateConflict {
            series_id: Uuid::nil(),
            status: crate::models::SeriesStatus::Cancelled,
            command: "cancel an occurrence of",
        });
        assert!(matches!(reason, FailureReason::StateConflict(ref m) if m.contains("cancelled")));
        assert_eq!(
            FailureReason::from(CoreError::NotFound("x".to_string())),
            FailureReason::NotFound
        );
    }
}
