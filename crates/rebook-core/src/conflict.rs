use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    BookedInterval, Buffers, ConflictDescriptor, ConflictType, Occurrence, OccurrenceStatus,
};
use crate::timezone::civil_date;

/// Classifies candidate slots against a snapshot of one resource's bookings.
///
/// Every method is a pure function of the snapshot and its arguments. Intervals are
/// padded by their buffers and compared half-open, so back-to-back bookings do not
/// collide.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    resource_id: String,
    bookings: Vec<BookedInterval>,
    horizon: Option<DateTime<Utc>>,
}

impl ConflictDetector {
    /// Bookings for other resources are dropped.
    pub fn new(resource_id: impl Into<String>, bookings: Vec<BookedInterval>) -> Self {
        let resource_id = resource_id.into();
        let mut bookings: Vec<BookedInterval> = bookings
            .into_iter()
            .filter(|b| b.resource_id == resource_id)
            .collect();
        bookings.sort_by_key(|b| (b.start_at, b.appointment_id));
        Self {
            resource_id,
            bookings,
            horizon: None,
        }
    }

    /// Suggested slots never start after `horizon`.
    pub fn with_horizon(mut self, horizon: DateTime<Utc>) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn bookings(&self) -> &[BookedInterval] {
        &self.bookings
    }

    pub fn add_booking(&mut self, booking: BookedInterval) {
        if booking.resource_id != self.resource_id {
            return;
        }
        let at = self
            .bookings
            .partition_point(|b| {
                (b.start_at, b.appointment_id) < (booking.start_at, booking.appointment_id)
            });
        self.bookings.insert(at, booking);
    }

    pub fn remove_booking(&mut self, appointment_id: Uuid) -> Option<BookedInterval> {
        let index = self
            .bookings
            .iter()
            .position(|b| b.appointment_id == appointment_id)?;
        Some(self.bookings.remove(index))
    }

    /// Bookings whose padded interval overlaps the padded candidate, in start order.
    pub fn overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        buffers: Buffers,
    ) -> Vec<&BookedInterval> {
        let (padded_start, padded_end) = buffers.pad(start, end);
        self.bookings
            .iter()
            .filter(|booking| {
                let (booked_start, booked_end) = booking.padded();
                padded_start < booked_end && booked_start < padded_end
            })
            .collect()
    }

    pub fn is_free(&self, start: DateTime<Utc>, end: DateTime<Utc>, buffers: Buffers) -> bool {
        self.overlapping(start, end, buffers).is_empty()
    }

    /// First later slot on the same civil day, probed in steps of the slot's own length.
    pub fn suggest_slot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        buffers: Buffers,
        tz: &Tz,
    ) -> Option<DateTime<Utc>> {
        let duration = end - start;
        if duration <= chrono::Duration::zero() {
            return None;
        }
        let day = civil_date(tz, start);
        let mut probe = start + duration;
        while civil_date(tz, probe) == day {
            if self.horizon.is_some_and(|horizon| probe > horizon) {
                return None;
            }
            if self.is_free(probe, probe + duration, buffers) {
                return Some(probe);
            }
            probe += duration;
        }
        None
    }

    /// One descriptor per overlapping booking, all sharing the same suggested resolution.
    pub fn describe(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        buffers: Buffers,
        tz: &Tz,
    ) -> Vec<ConflictDescriptor> {
        let overlapping = self.overlapping(start, end, buffers);
        if overlapping.is_empty() {
            return Vec::new();
        }
        let suggestion = self.suggest_slot(start, end, buffers, tz);
        overlapping
            .into_iter()
            .map(|booking| ConflictDescriptor {
                conflict_type: ConflictType::DoubleBooking,
                conflicting_appointment_id: booking.appointment_id,
                conflicting_start: booking.start_at,
                conflicting_end: booking.end_at,
                suggested_resolution: suggestion,
            })
            .collect()
    }

    /// Marks each non-excluded candidate `available` or `conflict`.
    pub fn annotate(
        &self,
        candidates: Vec<Occurrence>,
        buffers: Buffers,
        tz: &Tz,
    ) -> Vec<Occurrence> {
        let annotated: Vec<Occurrence> = candidates
            .into_iter()
            .map(|mut occurrence| {
                if occurrence.status == OccurrenceStatus::Excluded {
                    return occurrence;
                }
                let conflicts = self.describe(occurrence.start_at, occurrence.end_at, buffers, tz);
                occurrence.status = if conflicts.is_empty() {
                    OccurrenceStatus::Available
                } else {
                    OccurrenceStatus::Conflict
                };
                occurrence.conflicts = conflicts;
                occurrence
            })
            .collect();

        debug!(
            resource_id = %self.resource_id,
            bookings = self.bookings.len(),
            conflicts = annotated
                .iter()
                .filter(|o| o.status == OccurrenceStatus::Conflict)
                .count(),
            "Annotated candidates"
        );
        annotated
    }
}
