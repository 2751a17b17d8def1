//! The series state machine and its counters.
//!
//! ```text
//! active <-> paused
//! active/in_progress/paused -> cancelled      (terminal)
//! any non-terminal          -> completed      (automatic, terminal)
//! active <-> in_progress                      (reporting only)
//! ```
//!
//! [`SeriesManager`] works on an in-memory copy of one series and its appointments.
//! Persisting the result and serializing writers is the caller's job.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    Appointment, AppointmentStatus, PatternDefinition, PaymentStatus, Series, SeriesMetadata,
    SeriesStatistics, SeriesStatus,
};

impl Series {
    /// A fresh `active` series with `total_planned` fixed from the accepted occurrences.
    pub fn new(
        pattern: &PatternDefinition,
        metadata: SeriesMetadata,
        total_planned: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            pattern_id: pattern.id,
            resource_id: pattern.resource_id.clone(),
            title: metadata.title,
            client_name: metadata.client_name,
            notes: metadata.notes,
            status: SeriesStatus::Active,
            total_planned,
            total_completed: 0,
            total_cancelled: 0,
            total_rescheduled: 0,
            payment_type: metadata.payment_type,
            payment_status: derive_payment_status(0, metadata.total_series_price_cents),
            paid_amount_cents: 0,
            total_series_price_cents: metadata.total_series_price_cents,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Percentage (0-100) of planned occurrences completed.
    pub fn completion_percentage(&self) -> f64 {
        if self.total_planned == 0 {
            0.0
        } else {
            f64::from(self.total_completed) * 100.0 / f64::from(self.total_planned)
        }
    }

    pub fn balance_due_cents(&self) -> Option<i64> {
        if self.payment_status == PaymentStatus::Refunded {
            return None;
        }
        self.total_series_price_cents
            .map(|total| (total - self.paid_amount_cents).max(0))
    }

    fn state_conflict(&self, command: &'static str) -> CoreError {
        CoreError::StateConflict {
            series_id: self.id,
            status: self.status,
            command,
        }
    }
}

/// `paid` once the price is covered, `partial` below it, `pending` otherwise.
pub fn derive_payment_status(
    paid_amount_cents: i64,
    total_price_cents: Option<i64>,
) -> PaymentStatus {
    match total_price_cents {
        Some(total) if paid_amount_cents >= total => PaymentStatus::Paid,
        Some(_) if paid_amount_cents > 0 => PaymentStatus::Partial,
        _ => PaymentStatus::Pending,
    }
}

#[derive(Debug, Clone)]
pub struct SeriesManager {
    series: Series,
    appointments: Vec<Appointment>,
}

impl SeriesManager {
    /// Appointments are kept in sequence order.
    pub fn new(series: Series, mut appointments: Vec<Appointment>) -> Self {
        appointments.sort_by_key(|a| (a.sequence, a.start_at));
        Self {
            series,
            appointments,
        }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn appointment(&self, appointment_id: Uuid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == appointment_id)
    }

    pub fn into_parts(self) -> (Series, Vec<Appointment>) {
        (self.series, self.appointments)
    }

    /// Appointments still pending or confirmed.
    pub fn outstanding(&self) -> u32 {
        let count = self
            .appointments
            .iter()
            .filter(|a| a.status.is_outstanding())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if !self.series.status.is_running() {
            return Err(self.series.state_conflict("pause"));
        }
        self.transition(SeriesStatus::Paused, now);
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.series.status != SeriesStatus::Paused {
            return Err(self.series.state_conflict("resume"));
        }
        self.transition(SeriesStatus::Active, now);
        self.refresh_status(now);
        Ok(())
    }

    /// Cancels every outstanding appointment and ends the series. Completed appointments
    /// are left alone. Returns the ids of the appointments it cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<Vec<Uuid>, CoreError> {
        if self.series.status.is_terminal() {
            return Err(self.series.state_conflict("cancel"));
        }

        let outstanding = self.outstanding();
        self.check_counters(
            self.series.total_completed,
            self.series.total_cancelled + outstanding,
        )?;

        let mut cancelled = Vec::with_capacity(outstanding as usize);
        for appointment in self.appointments.iter_mut().filter(|a| a.status.is_outstanding()) {
            appointment.status = AppointmentStatus::Cancelled;
            appointment.updated_at = now;
            cancelled.push(appointment.id);
        }
        self.series.total_cancelled += outstanding;
        self.transition(SeriesStatus::Cancelled, now);

        info!(
            series_id = %self.series.id,
            cancelled = cancelled.len(),
            "Cancelled series"
        );
        Ok(cancelled)
    }

    pub fn complete_occurrence(
        &mut self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<&Appointment, CoreError> {
        let index = self.outstanding_index(appointment_id, "complete an occurrence of")?;
        self.check_counters(self.series.total_completed + 1, self.series.total_cancelled)?;

        self.appointments[index].status = AppointmentStatus::Completed;
        self.appointments[index].updated_at = now;
        self.series.total_completed += 1;
        self.series.updated_at = now;
        self.refresh_status(now);
        Ok(&self.appointments[index])
    }

    pub fn cancel_occurrence(
        &mut self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<&Appointment, CoreError> {
        let index = self.outstanding_index(appointment_id, "cancel an occurrence of")?;
        self.check_counters(self.series.total_completed, self.series.total_cancelled + 1)?;

        self.appointments[index].status = AppointmentStatus::Cancelled;
        self.appointments[index].updated_at = now;
        self.series.total_cancelled += 1;
        self.series.updated_at = now;
        self.refresh_status(now);
        Ok(&self.appointments[index])
    }

    /// Moves an outstanding appointment. The caller is responsible for checking the
    /// new slot against current bookings first.
    pub fn reschedule_occurrence(
        &mut self,
        appointment_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<&Appointment, CoreError> {
        let index = self.outstanding_index(appointment_id, "reschedule an occurrence of")?;
        if self.series.total_planned == 0 {
            return Err(CoreError::validation(format!(
                "series {} has no planned occurrences to reschedule",
                self.series.id
            )));
        }
        if end_at <= start_at {
            return Err(CoreError::validation("new slot must end after it starts"));
        }

        let appointment = &mut self.appointments[index];
        if appointment.original_scheduled_at.is_none() {
            appointment.original_scheduled_at = Some(appointment.start_at);
        }
        appointment.start_at = start_at;
        appointment.end_at = end_at;
        appointment.updated_at = now;
        self.series.total_rescheduled += 1;
        self.series.updated_at = now;

        debug!(
            series_id = %self.series.id,
            %appointment_id,
            %start_at,
            "Rescheduled occurrence"
        );
        Ok(&self.appointments[index])
    }

    pub fn record_payment(
        &mut self,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if self.series.status == SeriesStatus::Cancelled {
            return Err(self.series.state_conflict("record a payment for"));
        }
        if amount_cents <= 0 {
            return Err(CoreError::validation("payment amount must be positive"));
        }
        if self.series.payment_status == PaymentStatus::Refunded {
            return Err(CoreError::validation(format!(
                "series {} was refunded and accepts no further payments",
                self.series.id
            )));
        }
        let paid = self
            .series
            .paid_amount_cents
            .checked_add(amount_cents)
            .ok_or_else(|| CoreError::validation("payment amount overflows"))?;

        self.series.paid_amount_cents = paid;
        self.series.payment_status =
            derive_payment_status(paid, self.series.total_series_price_cents);
        self.series.updated_at = now;
        Ok(())
    }

    /// Explicit transition to `refunded`. Paid amounts return to zero.
    pub fn refund(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.series.payment_status == PaymentStatus::Refunded {
            return Err(CoreError::validation(format!(
                "series {} is already refunded",
                self.series.id
            )));
        }
        if self.series.paid_amount_cents == 0 {
            return Err(CoreError::validation(format!(
                "series {} has no payments to refund",
                self.series.id
            )));
        }
        self.series.paid_amount_cents = 0;
        self.series.payment_status = PaymentStatus::Refunded;
        self.series.updated_at = now;
        info!(series_id = %self.series.id, "Refunded series");
        Ok(())
    }

    /// Recomputes counters by scanning appointments. Returns whether anything changed.
    ///
    /// Reschedule events cannot be recovered from rows alone, so `total_rescheduled`
    /// only ever grows here.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> Result<bool, CoreError> {
        let count = |status: AppointmentStatus| {
            self.appointments.iter().filter(|a| a.status == status).count() as u32
        };
        let completed = count(AppointmentStatus::Completed);
        let cancelled = count(AppointmentStatus::Cancelled);
        let moved = self
            .appointments
            .iter()
            .filter(|a| a.original_scheduled_at.is_some())
            .count() as u32;
        self.check_counters(completed, cancelled)?;

        let before = (
            self.series.total_completed,
            self.series.total_cancelled,
            self.series.total_rescheduled,
            self.series.status,
        );
        self.series.total_completed = completed;
        self.series.total_cancelled = cancelled;
        self.series.total_rescheduled = self.series.total_rescheduled.max(moved);
        self.refresh_status(now);

        let after = (
            self.series.total_completed,
            self.series.total_cancelled,
            self.series.total_rescheduled,
            self.series.status,
        );
        let changed = before != after;
        if changed {
            self.series.updated_at = now;
            info!(series_id = %self.series.id, "Reconciled series counters");
        }
        Ok(changed)
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> SeriesStatistics {
        let next_appointment_at = self
            .appointments
            .iter()
            .filter(|a| a.status.is_outstanding() && a.start_at >= now)
            .map(|a| a.start_at)
            .min();

        SeriesStatistics {
            series_id: self.series.id,
            status: self.series.status,
            total_planned: self.series.total_planned,
            total_completed: self.series.total_completed,
            total_cancelled: self.series.total_cancelled,
            total_rescheduled: self.series.total_rescheduled,
            outstanding: self.outstanding(),
            completion_percentage: self.series.completion_percentage(),
            payment_status: self.series.payment_status,
            paid_amount_cents: self.series.paid_amount_cents,
            balance_due_cents: self.series.balance_due_cents(),
            next_appointment_at,
        }
    }

    /// Re-derives the automatic and reporting-only statuses from the counters.
    fn refresh_status(&mut self, now: DateTime<Utc>) {
        let status = self.series.status;
        if status.is_terminal() {
            return;
        }
        let outstanding = self.outstanding();
        if self.series.total_completed == self.series.total_planned && outstanding == 0 {
            self.transition(SeriesStatus::Completed, now);
            return;
        }
        if status == SeriesStatus::Paused {
            return;
        }
        let touched = self.series.total_completed + self.series.total_cancelled > 0;
        let next = if touched && outstanding > 0 {
            SeriesStatus::InProgress
        } else {
            SeriesStatus::Active
        };
        if next != status {
            self.transition(next, now);
        }
    }

    fn transition(&mut self, to: SeriesStatus, now: DateTime<Utc>) {
        debug!(
            series_id = %self.series.id,
            from = %self.series.status,
            %to,
            "Series status transition"
        );
        self.series.status = to;
        self.series.updated_at = now;
    }

    /// The appointment, if the series and the appointment both still accept changes.
    pub fn ensure_outstanding(
        &self,
        appointment_id: Uuid,
        command: &'static str,
    ) -> Result<&Appointment, CoreError> {
        let index = self.outstanding_index(appointment_id, command)?;
        Ok(&self.appointments[index])
    }

    fn outstanding_index(
        &self,
        appointment_id: Uuid,
        command: &'static str,
    ) -> Result<usize, CoreError> {
        if self.series.status.is_terminal() {
            return Err(self.series.state_conflict(command));
        }
        let index = self
            .appointments
            .iter()
            .position(|a| a.id == appointment_id)
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "appointment {} in series {}",
                    appointment_id, self.series.id
                ))
            })?;
        let status = self.appointments[index].status;
        if !status.is_outstanding() {
            return Err(CoreError::validation(format!(
                "appointment {} is {} and can no longer change",
                appointment_id, status
            )));
        }
        Ok(index)
    }

    fn check_counters(&self, completed: u32, cancelled: u32) -> Result<(), CoreError> {
        if completed + cancelled > self.series.total_planned {
            return Err(CoreError::InvariantViolation(format!(
                "series {}: completed {} + cancelled {} exceeds planned {}",
                self.series.id, completed, cancelled, self.series.total_planned
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatternType, PaymentType};
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Weekday};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn pattern() -> PatternDefinition {
        PatternDefinition {
            id: Uuid::now_v7(),
            resource_id: "barber-1".to_string(),
            pattern_type: PatternType::Weekly,
            preferred_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            duration_minutes: 45,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            end_date: None,
            occurrence_count: Some(7),
            days_of_week: vec![Weekday::Tue],
            day_of_month: None,
            week_of_month: None,
            weekday_of_month: None,
            interval_days: None,
            anchor_date: None,
            exclude_holidays: false,
            exclude_weekends: false,
            reschedule_on_conflict: false,
            max_advance_days: 365,
            buffer_before: 0,
            buffer_after: 0,
            timezone: "UTC".to_string(),
            created_at: now(),
        }
    }

    fn manager(planned: u32, price: Option<i64>) -> SeriesManager {
        let metadata = SeriesMetadata {
            title: "Haircut".to_string(),
            payment_type: PaymentType::SeriesUpfront,
            total_series_price_cents: price,
            ..Default::default()
        };
        let series = Series::new(&pattern(), metadata, planned, now());
        let appointments = (1..=planned)
            .map(|sequence| {
                let start = Utc.with_ymd_and_hms(2025, 3, 4, 14, 0, 0).unwrap()
                    + Duration::weeks(i64::from(sequence) - 1);
                Appointment {
                    id: Uuid::now_v7(),
                    series_id: Some(series.id),
                    sequence: Some(sequence),
                    resource_id: "barber-1".to_string(),
                    start_at: start,
                    end_at: start + Duration::minutes(45),
                    buffer_before: 0,
                    buffer_after: 0,
                    status: AppointmentStatus::Pending,
                    original_scheduled_at: None,
                    notes: None,
                    created_at: now(),
                    updated_at: now(),
                }
            })
            .collect();
        SeriesManager::new(series, appointments)
    }

    fn ids(manager: &SeriesManager) -> Vec<Uuid> {
        manager.appointments().iter().map(|a| a.id).collect()
    }

    fn with_status(status: SeriesStatus) -> SeriesManager {
        let mut manager = manager(3, None);
        let first = ids(&manager)[0];
        match status {
            SeriesStatus::Active => {}
            SeriesStatus::Paused => manager.pause(now()).unwrap(),
            SeriesStatus::InProgress => {
                manager.complete_occurrence(first, now()).unwrap();
            }
            SeriesStatus::Completed => {
                for id in ids(&manager) {
                    manager.complete_occurrence(id, now()).unwrap();
                }
            }
            SeriesStatus::Cancelled => {
                manager.cancel(now()).unwrap();
            }
        }
        assert_eq!(manager.series().status, status);
        manager
    }

    #[rstest]
    #[case(SeriesStatus::Active, true, false, true)]
    #[case(SeriesStatus::InProgress, true, false, true)]
    #[case(SeriesStatus::Paused, false, true, true)]
    #[case(SeriesStatus::Completed, false, false, false)]
    #[case(SeriesStatus::Cancelled, false, false, false)]
    fn test_command_legality(
        #[case] status: SeriesStatus,
        #[case] can_pause: bool,
        #[case] can_resume: bool,
        #[case] can_cancel: bool,
    ) {
        assert_eq!(with_status(status).pause(now()).is_ok(), can_pause);
        assert_eq!(with_status(status).resume(now()).is_ok(), can_resume);
        assert_eq!(with_status(status).cancel(now()).is_ok(), can_cancel);
    }

    #[test]
    fn test_rejected_command_mutates_nothing() {
        let mut manager = with_status(SeriesStatus::Cancelled);
        let before = manager.series().clone();
        match manager.pause(now()) {
            Err(CoreError::StateConflict { status, command, .. }) => {
                assert_eq!(status, SeriesStatus::Cancelled);
                assert_eq!(command, "pause");
            }
            other => panic!("expected state conflict, got {:?}", other),
        }
        assert_eq!(manager.series(), &before);
    }

    #[test]
    fn test_cancel_leaves_completed_appointments() {
        let mut manager = manager(7, None);
        let all = ids(&manager);
        manager.complete_occurrence(all[0], now()).unwrap();
        manager.complete_occurrence(all[1], now()).unwrap();

        let cancelled = manager.cancel(now()).unwrap();
        assert_eq!(cancelled.len(), 5);
        let series = manager.series();
        assert_eq!(series.total_cancelled, 5);
        assert_eq!(series.total_completed, 2);
        assert_eq!(series.status, SeriesStatus::Cancelled);
        assert_eq!(
            manager.appointment(all[0]).unwrap().status,
            AppointmentStatus::Completed
        );
        assert!(matches!(
            manager.pause(now()),
            Err(CoreError::StateConflict { .. })
        ));
    }

    #[test]
    fn test_in_progress_and_auto_completion() {
        let mut manager = manager(2, None);
        let all = ids(&manager);
        manager.complete_occurrence(all[0], now()).unwrap();
        assert_eq!(manager.series().status, SeriesStatus::InProgress);
        assert_eq!(manager.series().completion_percentage(), 50.0);

        manager.complete_occurrence(all[1], now()).unwrap();
        assert_eq!(manager.series().status, SeriesStatus::Completed);
        assert_eq!(manager.series().completion_percentage(), 100.0);
        assert!(manager.cancel(now()).is_err());
    }

    #[test]
    fn test_paused_series_can_still_complete() {
        let mut manager = manager(1, None);
        let only = ids(&manager)[0];
        manager.pause(now()).unwrap();
        manager.complete_occurrence(only, now()).unwrap();
        assert_eq!(manager.series().status, SeriesStatus::Completed);
    }

    #[test]
    fn test_resume_rederives_in_progress() {
        let mut manager = manager(3, None);
        let first = ids(&manager)[0];
        manager.cancel_occurrence(first, now()).unwrap();
        assert_eq!(manager.series().status, SeriesStatus::InProgress);
        manager.pause(now()).unwrap();
        manager.resume(now()).unwrap();
        assert_eq!(manager.series().status, SeriesStatus::InProgress);
    }

    #[test]
    fn test_individual_cancellation_does_not_end_series() {
        let mut manager = manager(2, None);
        let all = ids(&manager);
        manager.cancel_occurrence(all[0], now()).unwrap();
        manager.complete_occurrence(all[1], now()).unwrap();
        assert_eq!(manager.series().total_cancelled, 1);
        assert_eq!(manager.series().total_completed, 1);
        assert_eq!(manager.series().status, SeriesStatus::Active);
    }

    #[test]
    fn test_occurrence_cannot_change_twice() {
        let mut manager = manager(2, None);
        let first = ids(&manager)[0];
        manager.complete_occurrence(first, now()).unwrap();
        assert!(matches!(
            manager.cancel_occurrence(first, now()),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(manager.series().total_cancelled, 0);
    }

    #[test]
    fn test_reschedule_records_original_slot_once() {
        let mut manager = manager(2, None);
        let first = ids(&manager)[0];
        let original = manager.appointment(first).unwrap().start_at;

        let moved = original + Duration::days(1);
        manager
            .reschedule_occurrence(first, moved, moved + Duration::minutes(45), now())
            .unwrap();
        let moved_again = original + Duration::days(2);
        let appointment = manager
            .reschedule_occurrence(first, moved_again, moved_again + Duration::minutes(45), now())
            .unwrap();

        assert_eq!(appointment.original_scheduled_at, Some(original));
        assert_eq!(appointment.start_at, moved_again);
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(manager.series().total_rescheduled, 2);
        assert_eq!(manager.series().total_planned, 2);
    }

    #[test]
    fn test_payment_status_derivation() {
        assert_eq!(derive_payment_status(0, Some(10_000)), PaymentStatus::Pending);
        assert_eq!(derive_payment_status(2_500, Some(10_000)), PaymentStatus::Partial);
        assert_eq!(derive_payment_status(10_000, Some(10_000)), PaymentStatus::Paid);
        assert_eq!(derive_payment_status(12_000, Some(10_000)), PaymentStatus::Paid);
        assert_eq!(derive_payment_status(2_500, None), PaymentStatus::Pending);
    }

    #[test]
    fn test_payments_and_refund() {
        let mut manager = manager(3, Some(9_000));
        manager.record_payment(3_000, now()).unwrap();
        assert_eq!(manager.series().payment_status, PaymentStatus::Partial);
        assert_eq!(manager.series().balance_due_cents(), Some(6_000));
        manager.record_payment(6_000, now()).unwrap();
        assert_eq!(manager.series().payment_status, PaymentStatus::Paid);

        manager.refund(now()).unwrap();
        assert_eq!(manager.series().payment_status, PaymentStatus::Refunded);
        assert_eq!(manager.series().paid_amount_cents, 0);
        assert!(manager.record_payment(1_000, now()).is_err());
        assert!(manager.refund(now()).is_err());
    }

    #[test]
    fn test_refund_allowed_after_cancellation() {
        let mut manager = manager(3, Some(9_000));
        manager.record_payment(9_000, now()).unwrap();
        manager.cancel(now()).unwrap();
        assert!(matches!(
            manager.record_payment(100, now()),
            Err(CoreError::StateConflict { .. })
        ));
        manager.refund(now()).unwrap();
    }

    #[test]
    fn test_reconcile_repairs_drifted_counters() {
        let mut manager = manager(3, None);
        let first = ids(&manager)[0];
        manager.complete_occurrence(first, now()).unwrap();
        let (mut series, appointments) = manager.into_parts();
        series.total_completed = 0;
        series.status = SeriesStatus::Active;

        let mut manager = SeriesManager::new(series, appointments);
        assert!(manager.reconcile(now()).unwrap());
        assert_eq!(manager.series().total_completed, 1);
        assert_eq!(manager.series().status, SeriesStatus::InProgress);
        assert!(!manager.reconcile(now()).unwrap());
    }

    #[test]
    fn test_statistics() {
        let mut manager = manager(4, Some(8_000));
        let all = ids(&manager);
        manager.complete_occurrence(all[0], now()).unwrap();
        manager.cancel_occurrence(all[1], now()).unwrap();
        manager.record_payment(2_000, now()).unwrap();

        let stats = manager.statistics(now());
        assert_eq!(stats.outstanding, 2);
        assert_eq!(stats.completion_percentage, 25.0);
        assert_eq!(stats.balance_due_cents, Some(6_000));
        assert_eq!(
            stats.next_appointment_at,
            Some(manager.appointment(all[2]).unwrap().start_at)
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Command {
            Complete(usize),
            Cancel(usize),
            Reschedule(usize, i64),
            CancelSeries,
            Pause,
            Resume,
        }

        fn command() -> impl Strategy<Value = Command> {
            prop_oneof![
                (0usize..8).prop_map(Command::Complete),
                (0usize..8).prop_map(Command::Cancel),
                (0usize..8, -3i64..4).prop_map(|(i, days)| Command::Reschedule(i, days)),
                Just(Command::CancelSeries),
                Just(Command::Pause),
                Just(Command::Resume),
            ]
        }

        fn run(
            manager: &mut SeriesManager,
            all: &[Uuid],
            command: &Command,
        ) -> Result<(), CoreError> {
            let pick = |i: usize| all[i % all.len()];
            match *command {
                Command::Complete(i) => manager.complete_occurrence(pick(i), now()).map(|_| ()),
                Command::Cancel(i) => manager.cancel_occurrence(pick(i), now()).map(|_| ()),
                Command::Reschedule(i, days) => {
                    let id = pick(i);
                    let start = manager
                        .appointment(id)
                        .map(|a| a.start_at + Duration::days(days))
                        .unwrap_or_else(now);
                    manager
                        .reschedule_occurrence(id, start, start + Duration::minutes(45), now())
                        .map(|_| ())
                }
                Command::CancelSeries => manager.cancel(now()).map(|_| ()),
                Command::Pause => manager.pause(now()),
                Command::Resume => manager.resume(now()),
            }
        }

        proptest! {
            #[test]
            fn counters_hold_under_any_command_sequence(
                planned in 1u32..8,
                commands in prop::collection::vec(command(), 0..40),
            ) {
                let mut manager = manager(planned, Some(10_000));
                let all = ids(&manager);

                for command in &commands {
                    let before = manager.series().clone();
                    let result = run(&mut manager, &all, command);
                    let series = manager.series();

                    prop_assert!(
                        series.total_completed + series.total_cancelled <= series.total_planned
                    );
                    let rows = |status: AppointmentStatus| {
                        manager
                            .appointments()
                            .iter()
                            .filter(|a| a.status == status)
                            .count() as u32
                    };
                    prop_assert_eq!(series.total_completed, rows(AppointmentStatus::Completed));
                    prop_assert_eq!(series.total_cancelled, rows(AppointmentStatus::Cancelled));

                    if before.status == SeriesStatus::Cancelled {
                        prop_assert!(
                            result.is_err(),
                            "{:?} succeeded on a cancelled series",
                            command
                        );
                    }
                    if result.is_err() {
                        prop_assert_eq!(series, &before);
                    }
                }
            }
        }
    }
}
