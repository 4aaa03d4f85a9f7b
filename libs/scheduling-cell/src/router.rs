// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Core scheduling: creation and rescheduling share the same pipeline
        .route("/", post(handlers::schedule_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/status", post(handlers::transition_appointment_status))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        // Read-only conflict preview (the debounced form check)
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        // Listings
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .with_state(state)
}
