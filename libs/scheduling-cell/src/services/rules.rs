// libs/scheduling-cell/src/services/rules.rs
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};

use crate::models::RuleViolation;

pub const OPENING_HOUR: u32 = 7;
/// Last moment an appointment may end. Bookings starting at or after this
/// hour are rejected even though the clinic itself stays open until 19:00.
pub const CLOSING_HOUR: u32 = 18;
pub const SLOT_GRANULARITY_MINUTES: i32 = 15;
pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 180;

/// Validate a candidate start time and duration against the clinic's booking
/// rules. Pure function of its inputs; returns every violated rule in rule
/// order (empty = valid).
pub fn validate_slot(start: DateTime<Utc>, duration_minutes: i32) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    if matches!(start.weekday(), Weekday::Sat | Weekday::Sun) {
        violations.push(RuleViolation::Weekend);
    }

    let end = start + Duration::minutes(duration_minutes as i64);
    let closing = start
        .date_naive()
        .and_hms_opt(CLOSING_HOUR, 0, 0)
        .unwrap()
        .and_utc();
    if start.hour() < OPENING_HOUR || start.hour() >= CLOSING_HOUR || end > closing {
        violations.push(RuleViolation::OutsideBusinessHours);
    }

    if duration_minutes % SLOT_GRANULARITY_MINUTES != 0 {
        violations.push(RuleViolation::InvalidDuration);
    }

    if duration_minutes < MIN_DURATION_MINUTES || duration_minutes > MAX_DURATION_MINUTES {
        violations.push(RuleViolation::DurationOutOfBounds);
    }

    violations
}
