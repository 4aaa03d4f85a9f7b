// libs/scheduling-cell/tests/scheduling_logic_test.rs
//
// Pure-logic tests for the interval model, business-rule validator,
// conflict checker and lifecycle transition table.

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use scheduling_cell::models::{Appointment, AppointmentStatus, RuleViolation, SchedulingError};
use scheduling_cell::services::conflict::{find_conflicts, suggest_alternatives};
use scheduling_cell::services::interval::TimeSlot;
use scheduling_cell::services::lifecycle::LifecycleService;
use scheduling_cell::services::rules::validate_slot;

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn appointment(
    doctor_id: Uuid,
    start: &str,
    duration_minutes: i32,
    status: AppointmentStatus,
) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id,
        clinic_id: Uuid::new_v4(),
        start_time: ts(start),
        duration_minutes,
        status,
        notes: None,
        external_calendar_ref: None,
        created_at: ts("2024-01-10T10:00:00Z"),
        updated_at: ts("2024-01-10T10:00:00Z"),
    }
}

// ==============================================================================
// INTERVAL MODEL
// ==============================================================================

#[test]
fn slot_end_is_start_plus_duration() {
    let slot = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60);
    assert_eq!(slot.start(), ts("2024-01-15T14:00:00Z"));
    assert_eq!(slot.end(), ts("2024-01-15T15:00:00Z"));
}

#[test]
fn buffered_extends_both_ends_by_fifteen_minutes() {
    let slot = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60).buffered();
    assert_eq!(slot.start(), ts("2024-01-15T13:45:00Z"));
    assert_eq!(slot.end(), ts("2024-01-15T15:15:00Z"));
}

#[test]
fn edge_touching_slots_do_not_overlap() {
    let a = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60);
    let b = TimeSlot::new(ts("2024-01-15T15:00:00Z"), 30);
    assert!(!a.overlaps(&b));
    assert!(!b.overlaps(&a));
}

#[test]
fn overlap_is_symmetric() {
    let a = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60);
    let b = TimeSlot::new(ts("2024-01-15T14:30:00Z"), 60);
    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));
}

// ==============================================================================
// BUSINESS-RULE VALIDATOR
// ==============================================================================

#[test]
fn weekday_slot_inside_business_hours_is_valid() {
    // 2024-01-15 is a Monday
    assert!(validate_slot(ts("2024-01-15T14:00:00Z"), 60).is_empty());
}

#[test]
fn saturday_is_a_weekend_violation_regardless_of_time() {
    // 2024-01-20 is a Saturday
    let violations = validate_slot(ts("2024-01-20T10:00:00Z"), 30);
    assert!(violations.contains(&RuleViolation::Weekend));
}

#[test]
fn sunday_is_a_weekend_violation() {
    let violations = validate_slot(ts("2024-01-21T10:00:00Z"), 30);
    assert!(violations.contains(&RuleViolation::Weekend));
}

#[test]
fn start_after_closing_violates_business_hours() {
    let violations = validate_slot(ts("2024-01-15T18:30:00Z"), 60);
    assert_eq!(violations, vec![RuleViolation::OutsideBusinessHours]);
}

#[test]
fn start_before_opening_violates_business_hours() {
    let violations = validate_slot(ts("2024-01-15T06:30:00Z"), 30);
    assert_eq!(violations, vec![RuleViolation::OutsideBusinessHours]);
}

#[test]
fn appointment_must_fit_before_the_closing_boundary() {
    // 17:15 + 60 minutes runs past 18:00
    let violations = validate_slot(ts("2024-01-15T17:15:00Z"), 60);
    assert_eq!(violations, vec![RuleViolation::OutsideBusinessHours]);
}

#[test]
fn appointment_ending_exactly_at_closing_is_valid() {
    assert!(validate_slot(ts("2024-01-15T17:00:00Z"), 60).is_empty());
}

#[test]
fn duration_not_a_multiple_of_fifteen_is_invalid() {
    let violations = validate_slot(ts("2024-01-15T14:00:00Z"), 20);
    assert_eq!(violations, vec![RuleViolation::InvalidDuration]);
}

#[test]
fn duration_above_cap_violates_bounds() {
    let violations = validate_slot(ts("2024-01-15T07:00:00Z"), 240);
    assert_eq!(violations, vec![RuleViolation::DurationOutOfBounds]);
}

#[test]
fn tiny_duration_violates_both_granularity_and_bounds() {
    let violations = validate_slot(ts("2024-01-15T14:00:00Z"), 10);
    assert_eq!(
        violations,
        vec![RuleViolation::InvalidDuration, RuleViolation::DurationOutOfBounds]
    );
}

#[test]
fn weekend_slot_reports_every_violated_rule() {
    // Saturday, after hours, 20-minute duration
    let violations = validate_slot(ts("2024-01-20T19:00:00Z"), 20);
    assert_eq!(
        violations,
        vec![
            RuleViolation::Weekend,
            RuleViolation::OutsideBusinessHours,
            RuleViolation::InvalidDuration,
        ]
    );
}

#[test]
fn validation_is_idempotent() {
    let first = validate_slot(ts("2024-01-20T19:00:00Z"), 20);
    let second = validate_slot(ts("2024-01-20T19:00:00Z"), 20);
    assert_eq!(first, second);
}

// ==============================================================================
// CONFLICT CHECKER
// ==============================================================================

#[test]
fn candidate_inside_buffered_existing_interval_conflicts() {
    // Existing 14:00 for 60 min buffers to [13:45, 15:15); a candidate
    // starting 14:45 lands inside it.
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::Scheduled,
    )];
    let candidate = TimeSlot::new(ts("2024-01-15T14:45:00Z"), 30);

    let conflicts = find_conflicts(doctor_id, candidate, &existing, None);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].id, existing[0].id);
    assert_eq!(conflicts[0].start_time, ts("2024-01-15T14:00:00Z"));
    assert_eq!(conflicts[0].end_time, ts("2024-01-15T15:00:00Z"));
}

#[test]
fn candidate_starting_at_buffered_end_does_not_conflict() {
    // The buffered existing interval ends exactly 15:15; the
    // half-open boundary leaves 15:15 itself bookable.
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::Scheduled,
    )];
    let candidate = TimeSlot::new(ts("2024-01-15T15:15:00Z"), 30);

    assert!(find_conflicts(doctor_id, candidate, &existing, None).is_empty());
}

#[test]
fn candidate_one_minute_before_buffered_end_conflicts() {
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::Confirmed,
    )];
    let candidate = TimeSlot::new(ts("2024-01-15T15:14:00Z"), 30);

    assert_eq!(find_conflicts(doctor_id, candidate, &existing, None).len(), 1);
}

#[test]
fn candidate_ending_at_buffered_start_does_not_conflict() {
    // Buffered existing interval starts 13:45; a candidate ending exactly
    // then is compatible.
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::Scheduled,
    )];
    let touching = TimeSlot::new(ts("2024-01-15T13:15:00Z"), 30);
    let crossing = TimeSlot::new(ts("2024-01-15T13:30:00Z"), 30);

    assert!(find_conflicts(doctor_id, touching, &existing, None).is_empty());
    assert_eq!(find_conflicts(doctor_id, crossing, &existing, None).len(), 1);
}

#[test]
fn terminal_status_appointments_never_conflict() {
    let doctor_id = Uuid::new_v4();
    let candidate = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60);

    for status in [
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
        AppointmentStatus::Completed,
    ] {
        let existing = vec![appointment(doctor_id, "2024-01-15T14:00:00Z", 60, status)];
        assert!(
            find_conflicts(doctor_id, candidate, &existing, None).is_empty(),
            "{} should not conflict",
            status
        );
    }
}

#[test]
fn in_progress_appointments_still_conflict() {
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::InProgress,
    )];
    let candidate = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60);

    assert_eq!(find_conflicts(doctor_id, candidate, &existing, None).len(), 1);
}

#[test]
fn other_doctors_appointments_are_ignored() {
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        Uuid::new_v4(),
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::Scheduled,
    )];
    let candidate = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60);

    assert!(find_conflicts(doctor_id, candidate, &existing, None).is_empty());
}

#[test]
fn other_days_are_ignored() {
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-16T14:00:00Z",
        60,
        AppointmentStatus::Scheduled,
    )];
    let candidate = TimeSlot::new(ts("2024-01-15T14:00:00Z"), 60);

    assert!(find_conflicts(doctor_id, candidate, &existing, None).is_empty());
}

#[test]
fn updated_appointment_does_not_conflict_with_itself() {
    let doctor_id = Uuid::new_v4();
    let own = appointment(doctor_id, "2024-01-15T14:00:00Z", 60, AppointmentStatus::Confirmed);
    let own_id = own.id;
    let existing = vec![own];

    // Moving the appointment 15 minutes later overlaps its own prior slot
    let candidate = TimeSlot::new(ts("2024-01-15T14:15:00Z"), 60);

    assert_eq!(find_conflicts(doctor_id, candidate, &existing, None).len(), 1);
    assert!(find_conflicts(doctor_id, candidate, &existing, Some(own_id)).is_empty());
}

#[test]
fn conflict_check_is_idempotent() {
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::Scheduled,
    )];
    let candidate = TimeSlot::new(ts("2024-01-15T14:45:00Z"), 30);

    let first = find_conflicts(doctor_id, candidate, &existing, None);
    let second = find_conflicts(doctor_id, candidate, &existing, None);
    assert_eq!(first, second);
}

// ==============================================================================
// ALTERNATIVE SLOT SUGGESTIONS
// ==============================================================================

#[test]
fn suggestions_are_valid_conflict_free_and_capped() {
    let doctor_id = Uuid::new_v4();
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T14:00:00Z",
        60,
        AppointmentStatus::Scheduled,
    )];
    let requested = TimeSlot::new(ts("2024-01-15T14:45:00Z"), 30);

    let suggestions = suggest_alternatives(doctor_id, requested, 30, &existing, None);

    assert_eq!(suggestions.len(), 3);
    assert_eq!(suggestions[0].start_time, ts("2024-01-15T07:00:00Z"));
    for slot in &suggestions {
        assert_ne!(slot.start_time, requested.start());
        assert!(validate_slot(slot.start_time, 30).is_empty());
        let probe = TimeSlot::new(slot.start_time, 30);
        assert!(find_conflicts(doctor_id, probe, &existing, None).is_empty());
    }
}

#[test]
fn no_suggestions_on_a_fully_booked_day() {
    let doctor_id = Uuid::new_v4();
    // One appointment spanning the whole bookable window
    let existing = vec![appointment(
        doctor_id,
        "2024-01-15T07:00:00Z",
        180,
        AppointmentStatus::Scheduled,
    ),
    appointment(doctor_id, "2024-01-15T10:15:00Z", 180, AppointmentStatus::Scheduled),
    appointment(doctor_id, "2024-01-15T13:30:00Z", 180, AppointmentStatus::Scheduled),
    appointment(doctor_id, "2024-01-15T16:45:00Z", 75, AppointmentStatus::Scheduled)];
    let requested = TimeSlot::new(ts("2024-01-15T09:00:00Z"), 60);

    let suggestions = suggest_alternatives(doctor_id, requested, 60, &existing, None);
    assert!(suggestions.is_empty());
}

// ==============================================================================
// LIFECYCLE TRANSITION TABLE
// ==============================================================================

#[test]
fn happy_path_transitions_are_allowed() {
    let lifecycle = LifecycleService::new();

    assert!(lifecycle
        .validate_transition(AppointmentStatus::Scheduled, AppointmentStatus::Confirmed)
        .is_ok());
    assert!(lifecycle
        .validate_transition(AppointmentStatus::Confirmed, AppointmentStatus::InProgress)
        .is_ok());
    assert!(lifecycle
        .validate_transition(AppointmentStatus::InProgress, AppointmentStatus::Completed)
        .is_ok());
}

#[test]
fn cancel_and_no_show_reachable_from_scheduled_and_confirmed() {
    let lifecycle = LifecycleService::new();

    for from in [AppointmentStatus::Scheduled, AppointmentStatus::Confirmed] {
        assert!(lifecycle
            .validate_transition(from, AppointmentStatus::Cancelled)
            .is_ok());
        assert!(lifecycle
            .validate_transition(from, AppointmentStatus::NoShow)
            .is_ok());
    }
}

#[test]
fn terminal_statuses_have_no_outgoing_transitions() {
    let lifecycle = LifecycleService::new();

    for from in [
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ] {
        assert!(lifecycle.valid_transitions(from).is_empty());
    }
}

#[test]
fn completed_appointment_cannot_move_back_to_scheduled() {
    let lifecycle = LifecycleService::new();

    let result =
        lifecycle.validate_transition(AppointmentStatus::Completed, AppointmentStatus::Scheduled);
    assert_matches!(
        result,
        Err(SchedulingError::InvalidStatusTransition {
            from: AppointmentStatus::Completed,
            to: AppointmentStatus::Scheduled,
        })
    );
}

#[test]
fn scheduled_cannot_skip_straight_to_completed() {
    let lifecycle = LifecycleService::new();

    let result =
        lifecycle.validate_transition(AppointmentStatus::Scheduled, AppointmentStatus::Completed);
    assert_matches!(result, Err(SchedulingError::InvalidStatusTransition { .. }));
}
