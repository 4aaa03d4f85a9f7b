// libs/scheduling-cell/src/services/scheduling.rs
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentStatus, ConflictCheckQuery, ConflictCheckResponse,
    RescheduleAppointmentRequest, ScheduleAppointmentRequest, SchedulingError,
    StatusTransitionRequest,
};
use crate::services::conflict;
use crate::services::interval::TimeSlot;
use crate::services::lifecycle::LifecycleService;
use crate::services::rules;

/// Orchestrates the business-rule validator and the conflict checker against
/// persisted appointments. Creation and rescheduling run the exact same
/// pipeline; the only difference is the excluded appointment id.
pub struct SchedulingService {
    supabase: Arc<SupabaseClient>,
    lifecycle: LifecycleService,
}

impl SchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            lifecycle: LifecycleService::new(),
        }
    }

    /// Book a new appointment. Runs the business rules, then the conflict
    /// check against the doctor's same-day active appointments, then inserts.
    ///
    /// The database carries an exclusion constraint on the doctor's buffered
    /// time range, so a concurrent booking that slips past the in-process
    /// check still comes back as a conflict instead of a double booking.
    pub async fn schedule(
        &self,
        request: ScheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Scheduling appointment for patient {} with doctor {} at {}",
            request.patient_id, request.doctor_id, request.start_time
        );

        let violations = rules::validate_slot(request.start_time, request.duration_minutes);
        if !violations.is_empty() {
            return Err(SchedulingError::Validation(violations));
        }

        let slot = TimeSlot::new(request.start_time, request.duration_minutes);
        let existing = self
            .fetch_doctor_day(request.doctor_id, request.start_time.date_naive(), auth_token)
            .await?;

        let conflicts = conflict::find_conflicts(request.doctor_id, slot, &existing, None);
        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for doctor {} at {}",
                request.doctor_id, request.start_time
            );
            return Err(SchedulingError::Conflict(conflicts));
        }

        self.insert_appointment(&request, auth_token).await
    }

    /// Move an existing appointment to a new time, excluding its own prior
    /// interval from the comparison set.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Rescheduling appointment {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        if current.status.is_terminal() {
            return Err(SchedulingError::NotReschedulable(current.status));
        }

        let duration = request
            .new_duration_minutes
            .unwrap_or(current.duration_minutes);

        let violations = rules::validate_slot(request.new_start_time, duration);
        if !violations.is_empty() {
            return Err(SchedulingError::Validation(violations));
        }

        let slot = TimeSlot::new(request.new_start_time, duration);
        let existing = self
            .fetch_doctor_day(
                current.doctor_id,
                request.new_start_time.date_naive(),
                auth_token,
            )
            .await?;

        let conflicts = conflict::find_conflicts(
            current.doctor_id,
            slot,
            &existing,
            Some(appointment_id),
        );
        if !conflicts.is_empty() {
            warn!(
                "Conflict detected while rescheduling appointment {} to {}",
                appointment_id, request.new_start_time
            );
            return Err(SchedulingError::Conflict(conflicts));
        }

        let mut update = serde_json::Map::new();
        update.insert("start_time".to_string(), json!(request.new_start_time.to_rfc3339()));
        update.insert("duration_minutes".to_string(), json!(duration));
        if let Some(reason) = request.reason {
            update.insert("notes".to_string(), json!(reason));
        }

        let updated = self
            .patch_appointment(&current, slot, Value::Object(update), auth_token)
            .await?;

        info!("Appointment {} rescheduled successfully", appointment_id);
        Ok(updated)
    }

    /// Apply a status transition after checking it against the lifecycle
    /// transition table.
    pub async fn transition_status(
        &self,
        appointment_id: Uuid,
        request: StatusTransitionRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Transitioning appointment {} to {}",
            appointment_id, request.new_status
        );

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle
            .validate_transition(current.status, request.new_status)?;

        let mut update = serde_json::Map::new();
        update.insert("status".to_string(), json!(request.new_status.to_string()));
        if let Some(reason) = request.reason {
            update.insert("notes".to_string(), json!(reason));
        }

        let updated = self
            .patch_appointment(&current, current.slot(), Value::Object(update), auth_token)
            .await?;

        info!(
            "Appointment {} transitioned from {} to {}",
            appointment_id, current.status, request.new_status
        );
        Ok(updated)
    }

    /// Read-only conflict preview for a candidate slot. Safe to call
    /// repeatedly (e.g. the debounced form preview); never mutates anything.
    pub async fn check_conflicts(
        &self,
        query: ConflictCheckQuery,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, SchedulingError> {
        let violations = rules::validate_slot(query.start_time, query.duration_minutes);

        let slot = TimeSlot::new(query.start_time, query.duration_minutes);
        let existing = self
            .fetch_doctor_day(query.doctor_id, query.start_time.date_naive(), auth_token)
            .await?;

        let conflicting_appointments = conflict::find_conflicts(
            query.doctor_id,
            slot,
            &existing,
            query.exclude_appointment_id,
        );

        let suggested_alternatives = if conflicting_appointments.is_empty() {
            vec![]
        } else {
            conflict::suggest_alternatives(
                query.doctor_id,
                slot,
                query.duration_minutes,
                &existing,
                query.exclude_appointment_id,
            )
        };

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_appointments.is_empty(),
            violations,
            conflicting_appointments,
            suggested_alternatives,
        })
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(SchedulingError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| SchedulingError::Database(format!("Failed to parse appointment: {}", e)))
    }

    /// All of a doctor's appointments on a calendar day, any status.
    pub async fn list_doctor_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.fetch_doctor_day(doctor_id, day, auth_token).await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn fetch_doctor_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let day_start = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let day_end = day_start + Duration::days(1);

        let query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("start_time=gte.{}", urlencoding::encode(&day_start.to_rfc3339())),
            format!("start_time=lt.{}", urlencoding::encode(&day_end.to_rfc3339())),
        ];

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::Database(format!("Failed to parse appointments: {}", e)))
    }

    async fn insert_appointment(
        &self,
        request: &ScheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let now = Utc::now();
        let body = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "clinic_id": request.clinic_id,
            "start_time": request.start_time.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "status": AppointmentStatus::Scheduled.to_string(),
            "notes": request.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = match self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_conflict() => {
                let slot = TimeSlot::new(request.start_time, request.duration_minutes);
                return Err(self
                    .lost_race_conflict(request.doctor_id, slot, None, auth_token)
                    .await);
            }
            Err(e) => return Err(SchedulingError::Database(e.to_string())),
        };

        let row = result.into_iter().next().ok_or_else(|| {
            SchedulingError::Database("Failed to create appointment".to_string())
        })?;

        let appointment: Appointment = serde_json::from_value(row).map_err(|e| {
            SchedulingError::Database(format!("Failed to parse created appointment: {}", e))
        })?;

        info!("Appointment {} created", appointment.id);
        Ok(appointment)
    }

    async fn patch_appointment(
        &self,
        current: &Appointment,
        slot: TimeSlot,
        mut update: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        if let Some(map) = update.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", current.id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = match self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update), Some(headers))
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_conflict() => {
                return Err(self
                    .lost_race_conflict(current.doctor_id, slot, Some(current.id), auth_token)
                    .await);
            }
            Err(e) => return Err(SchedulingError::Database(e.to_string())),
        };

        let row = result.into_iter().next().ok_or_else(|| {
            SchedulingError::Database("Failed to update appointment".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| {
            SchedulingError::Database(format!("Failed to parse updated appointment: {}", e))
        })
    }

    /// A write rejected by the exclusion constraint means another request won
    /// the slot between our check and the commit. Re-fetch the day so the
    /// conflict response names the booking that won.
    async fn lost_race_conflict(
        &self,
        doctor_id: Uuid,
        slot: TimeSlot,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> SchedulingError {
        warn!(
            "Exclusion constraint rejected write for doctor {} at {} (lost the race)",
            doctor_id,
            slot.start()
        );

        let conflicts = match self
            .fetch_doctor_day(doctor_id, slot.start().date_naive(), auth_token)
            .await
        {
            Ok(existing) => {
                conflict::find_conflicts(doctor_id, slot, &existing, exclude_appointment_id)
            }
            Err(_) => vec![],
        };

        SchedulingError::Conflict(conflicts)
    }
}
