pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentStatus, ConflictCheckResponse, ConflictingAppointment,
    RescheduleAppointmentRequest, RuleViolation, ScheduleAppointmentRequest, SchedulingError,
    StatusTransitionRequest, SuggestedSlot,
};

pub use router::scheduling_routes;
