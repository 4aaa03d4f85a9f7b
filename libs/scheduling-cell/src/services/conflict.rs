// libs/scheduling-cell/src/services/conflict.rs
use chrono::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, ConflictingAppointment, SuggestedSlot};
use crate::services::interval::TimeSlot;
use crate::services::rules::{
    self, CLOSING_HOUR, OPENING_HOUR, SLOT_GRANULARITY_MINUTES,
};

const MAX_SUGGESTIONS: usize = 3;

/// Find every existing appointment whose buffered interval intersects the
/// candidate slot.
///
/// The buffer is applied once, to the existing interval: it already encodes
/// the required gap on both sides, so the candidate is compared raw. An
/// appointment ending at 14:00 blocks candidates starting before 14:15 and
/// leaves 14:15 itself free (half-open boundary).
///
/// Pre-filters (not part of the interval math): same doctor, same calendar
/// day as the candidate start, active status only, and the appointment being
/// updated excluded from its own comparison set.
pub fn find_conflicts(
    doctor_id: Uuid,
    slot: TimeSlot,
    existing: &[Appointment],
    exclude_appointment_id: Option<Uuid>,
) -> Vec<ConflictingAppointment> {
    let day = slot.start().date_naive();

    let conflicts: Vec<ConflictingAppointment> = existing
        .iter()
        .filter(|apt| apt.doctor_id == doctor_id)
        .filter(|apt| apt.start_time.date_naive() == day)
        .filter(|apt| apt.status.is_active())
        .filter(|apt| exclude_appointment_id != Some(apt.id))
        .filter(|apt| apt.slot().buffered().overlaps(&slot))
        .map(|apt| ConflictingAppointment {
            id: apt.id,
            start_time: apt.start_time,
            end_time: apt.end_time(),
        })
        .collect();

    if !conflicts.is_empty() {
        debug!(
            "Found {} conflicting appointment(s) for doctor {} on {}",
            conflicts.len(),
            doctor_id,
            day
        );
    }

    conflicts
}

/// Scan the candidate's day in 15-minute steps for slots of the same duration
/// that pass both the business rules and the conflict check. Used by the
/// conflict-preview endpoint to offer alternatives alongside a rejection.
pub fn suggest_alternatives(
    doctor_id: Uuid,
    slot: TimeSlot,
    duration_minutes: i32,
    existing: &[Appointment],
    exclude_appointment_id: Option<Uuid>,
) -> Vec<SuggestedSlot> {
    let day = slot.start().date_naive();
    let mut current = day.and_hms_opt(OPENING_HOUR, 0, 0).unwrap().and_utc();
    let closing = day.and_hms_opt(CLOSING_HOUR, 0, 0).unwrap().and_utc();

    let mut suggestions = Vec::new();
    while current + Duration::minutes(duration_minutes as i64) <= closing
        && suggestions.len() < MAX_SUGGESTIONS
    {
        if current != slot.start() {
            let candidate = TimeSlot::new(current, duration_minutes);
            let valid = rules::validate_slot(current, duration_minutes).is_empty();
            if valid
                && find_conflicts(doctor_id, candidate, existing, exclude_appointment_id)
                    .is_empty()
            {
                suggestions.push(SuggestedSlot {
                    start_time: candidate.start(),
                    end_time: candidate.end(),
                });
            }
        }

        current += Duration::minutes(SLOT_GRANULARITY_MINUTES as i64);
    }

    suggestions
}
