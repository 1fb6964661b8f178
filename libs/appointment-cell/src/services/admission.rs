use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use booking_queue_cell::{EventPublisher, NotificationDispatcher, QueueEvent};
use shared_database::{ClinicStore, StoreError};
use shared_models::appointment::{
    Appointment, AppointmentStatus, BookingScope, DoctorFilter, PatientIdentity, QueueEntry,
    EMERGENCY_SLOT,
};
use shared_models::auth::Actor;
use shared_models::error::ValidationErrors;

use crate::models::{AppointmentError, BookAppointmentRequest};
use crate::services::calendar::SlotGrid;
use crate::services::token::TokenSequencer;

/// Attempts at claiming a token before a conflict is reported.
const MAX_TOKEN_ATTEMPTS: u32 = 3;

static TIME_SLOT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time slot pattern is valid"));

/// Who a booking is for and whether it jumps the queue, after applying
/// the caller's privileges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionTicket {
    pub patient: PatientIdentity,
    pub is_emergency: bool,
    pub time_slot: String,
}

pub struct AdmissionService {
    store: Arc<dyn ClinicStore>,
    sequencer: Arc<TokenSequencer>,
    events: Arc<dyn EventPublisher>,
    notifier: NotificationDispatcher,
}

impl AdmissionService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        sequencer: Arc<TokenSequencer>,
        events: Arc<dyn EventPublisher>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            sequencer,
            events,
            notifier,
        }
    }

    /// Validates and books an appointment, assigning the next token in its
    /// scope. Every rule is checked before anything is written.
    pub async fn admit(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let ticket = resolve_ticket(actor, &request)?;

        if let Actor::Staff { scope, .. } = actor {
            if !scope.covers(request.organization_id, request.department_id) {
                warn!("Staff {} tried to book outside their scope", actor.user_id());
                return Err(AppointmentError::AccessDenied(
                    "Department is outside your assignment".to_string(),
                ));
            }
        }

        if actor.is_privileged() {
            if let PatientIdentity::Registered { user_id } = &ticket.patient {
                if self.store.user(*user_id).await?.is_none() {
                    return Err(AppointmentError::NotFound("User".to_string()));
                }
            }
        }

        if self
            .store
            .find_active_booking(&ticket.patient, request.department_id, request.date)
            .await?
            .is_some()
        {
            info!("Rejected duplicate booking for {} on {}", ticket.patient, request.date);
            return Err(AppointmentError::DuplicateBooking);
        }

        let department = self
            .store
            .department(request.department_id)
            .await?
            .filter(|d| d.organization_id == request.organization_id)
            .ok_or(AppointmentError::DepartmentUnavailable)?;

        if !ticket.is_emergency && !SlotGrid::for_department(&department).contains(&ticket.time_slot) {
            return Err(ValidationErrors::single(
                "time_slot",
                format!(
                    "{} is not a {}-minute slot between 09:00 and 17:00",
                    ticket.time_slot, department.slot_duration_minutes
                ),
            )
            .into());
        }

        if let Some(doctor_id) = request.doctor_id {
            self.store
                .doctor(doctor_id)
                .await?
                .filter(|doctor| doctor.accepts_bookings_for(department.id))
                .ok_or(AppointmentError::DoctorUnavailable)?;
        }

        let scope = BookingScope {
            organization_id: request.organization_id,
            department_id: department.id,
            doctor_id: request.doctor_id,
            date: request.date,
        };

        let appointment = {
            let _scope_guard = self.sequencer.lock_scope(scope).await;

            if !ticket.is_emergency {
                let booked = self
                    .store
                    .count_active_in_slot(
                        department.id,
                        DoctorFilter::assigned(request.doctor_id),
                        request.date,
                        &ticket.time_slot,
                    )
                    .await?;

                if booked >= department.max_appointments_per_slot {
                    info!("Slot {} on {} is full ({} booked)", ticket.time_slot, request.date, booked);
                    return Err(AppointmentError::SlotFull {
                        time_slot: ticket.time_slot,
                    });
                }
            }

            self.insert_with_token(actor, &scope, &ticket).await?
        };

        info!(
            "Booked appointment {} with token {} in scope {}{}",
            appointment.id,
            appointment.token_number,
            scope,
            if appointment.is_emergency { " (emergency)" } else { "" }
        );

        self.events.publish(QueueEvent::NewAppointment(appointment.clone()));
        self.events.publish(QueueEvent::queue_update(&appointment));
        self.send_confirmation(&appointment).await;

        Ok(appointment)
    }

    async fn insert_with_token(
        &self,
        actor: &Actor,
        scope: &BookingScope,
        ticket: &AdmissionTicket,
    ) -> Result<Appointment, AppointmentError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let token_number = self.sequencer.next_token(scope).await?;
            let now = Utc::now();
            let appointment = Appointment {
                id: Uuid::new_v4(),
                patient: ticket.patient.clone(),
                booked_by_id: actor.user_id(),
                organization_id: scope.organization_id,
                department_id: scope.department_id,
                doctor_id: scope.doctor_id,
                date: scope.date,
                time_slot: ticket.time_slot.clone(),
                token_number,
                status: AppointmentStatus::Booked,
                is_emergency: ticket.is_emergency,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            };
            let entry = QueueEntry::waiting(appointment.id);

            match self.store.insert_booking(appointment, entry).await {
                Ok(saved) => return Ok(saved),
                Err(StoreError::TokenConflict { token, .. }) if attempt < MAX_TOKEN_ATTEMPTS => {
                    warn!("Token {} in scope {} was taken, retrying (attempt {})", token, scope, attempt);
                }
                Err(StoreError::TokenConflict { token, .. }) => {
                    return Err(AppointmentError::Conflict(format!(
                        "could not claim a token in scope {} after {} attempts (last tried {})",
                        scope, attempt, token
                    )));
                }
                Err(StoreError::DuplicateIdentity(_)) => return Err(AppointmentError::DuplicateBooking),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Resolves the patient's email from their user record and hands the
    /// confirmation to the background dispatcher.
    async fn send_confirmation(&self, appointment: &Appointment) {
        let Some(user_id) = appointment.user_id() else {
            debug!("Walk-in appointment {}, no confirmation to send", appointment.id);
            return;
        };

        match self.store.user(user_id).await {
            Ok(Some(user)) => {
                self.notifier
                    .dispatch_booking_confirmation(user.email, appointment.clone());
            }
            Ok(None) => debug!("User {} has no visible record, skipping confirmation", user_id),
            Err(e) => warn!("Could not resolve email for user {}: {}", user_id, e),
        }
    }
}

/// Applies caller privileges to the request: patients always book for
/// themselves and cannot flag emergencies; staff and admins name exactly
/// one identity.
pub fn resolve_ticket(
    actor: &Actor,
    request: &BookAppointmentRequest,
) -> Result<AdmissionTicket, AppointmentError> {
    let mut errors = ValidationErrors::new();

    let (patient, is_emergency) = match actor {
        Actor::Patient { user_id, .. } => {
            if request.is_emergency {
                debug!("Ignoring emergency flag from patient {}", user_id);
            }
            (Some(PatientIdentity::Registered { user_id: *user_id }), false)
        }
        Actor::Staff { .. } | Actor::Admin { .. } => {
            let name = request.patient_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
            let phone = request.patient_phone.as_deref().map(str::trim).filter(|s| !s.is_empty());

            let patient = match (request.user_id, name, phone) {
                (Some(user_id), None, None) => Some(PatientIdentity::Registered { user_id }),
                (None, Some(name), Some(phone)) => Some(PatientIdentity::WalkIn {
                    name: name.to_string(),
                    phone: phone.to_string(),
                }),
                (Some(_), _, _) => {
                    errors.push("user_id", "cannot be combined with walk-in patient details");
                    None
                }
                (None, Some(_), None) => {
                    errors.push("patient_phone", "is required for walk-in patients");
                    None
                }
                (None, None, Some(_)) => {
                    errors.push("patient_name", "is required for walk-in patients");
                    None
                }
                (None, None, None) => {
                    errors.push("user_id", "either user_id or patient_name and patient_phone is required");
                    None
                }
            };
            (patient, request.is_emergency)
        }
    };

    let time_slot = if is_emergency {
        EMERGENCY_SLOT.to_string()
    } else {
        match request.time_slot.as_deref().map(str::trim) {
            Some(slot) if TIME_SLOT_PATTERN.is_match(slot) => slot.to_string(),
            Some(_) => {
                errors.push("time_slot", "must be formatted as HH:MM");
                String::new()
            }
            None => {
                errors.push("time_slot", "is required");
                String::new()
            }
        }
    };

    errors.into_result()?;

    match patient {
        Some(patient) => Ok(AdmissionTicket {
            patient,
            is_emergency,
            time_slot,
        }),
        None => Err(ValidationErrors::single("user_id", "patient identity is required").into()),
    }
}
