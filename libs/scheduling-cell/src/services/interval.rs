// libs/scheduling-cell/src/services/interval.rs
use chrono::{DateTime, Duration, Utc};

/// Mandatory gap kept free before and after every appointment of a doctor.
pub const BUFFER_MINUTES: i64 = 15;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, duration_minutes: i32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(duration_minutes as i64),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// The occupancy this slot claims on a doctor's calendar: the interval
    /// extended by the scheduling buffer on both sides.
    pub fn buffered(&self) -> Self {
        Self {
            start: self.start - Duration::minutes(BUFFER_MINUTES),
            end: self.end + Duration::minutes(BUFFER_MINUTES),
        }
    }

    /// Standard half-open overlap test. Touching endpoints do not overlap,
    /// so two buffered slots meeting exactly edge-to-edge are compatible.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}
