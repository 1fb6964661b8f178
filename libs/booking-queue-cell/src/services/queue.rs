use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{AppointmentFilter, AppointmentOrder, ClinicStore};
use shared_models::appointment::{
    Appointment, AppointmentStatus, DoctorFilter, PatientIdentity, QueueStatus,
};
use shared_models::auth::Actor;
use shared_models::error::ValidationErrors;

use crate::error::BookingQueueError;
use crate::models::{
    QueueDashboard, QueueEvent, QueueTarget, QueueToggle, QueuedAppointment, ServingSummary,
    StaffAppointmentQuery, TokenCall,
};
use crate::services::events::EventPublisher;

/// Organization and optional department a staff action is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueScope {
    pub organization_id: Uuid,
    pub department_id: Option<Uuid>,
}

impl QueueScope {
    pub fn filter(&self) -> AppointmentFilter {
        AppointmentFilter::new()
            .organization(self.organization_id)
            .department(self.department_id)
    }
}

/// Staff-facing view over the persisted queue: ordering, calling,
/// pausing and daily counters.
pub struct QueueService {
    store: Arc<dyn ClinicStore>,
    events: Arc<dyn EventPublisher>,
}

impl QueueService {
    pub fn new(store: Arc<dyn ClinicStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Resolves the scope for a staff action. Staff with a fixed
    /// department cannot look outside it; administrators must name one.
    pub async fn resolve_scope(
        &self,
        actor: &Actor,
        department_id: Option<Uuid>,
    ) -> Result<QueueScope, BookingQueueError> {
        match actor {
            Actor::Patient { .. } => Err(BookingQueueError::AccessDenied(
                "Queue operations require a staff account".to_string(),
            )),
            Actor::Staff { scope, .. } => {
                let department_id = match (scope.department_id, department_id) {
                    (Some(fixed), Some(requested)) if fixed != requested => {
                        return Err(BookingQueueError::AccessDenied(
                            "Department is outside your assignment".to_string(),
                        ));
                    }
                    (Some(fixed), _) => Some(fixed),
                    (None, Some(requested)) => {
                        let department = self
                            .store
                            .department(requested)
                            .await?
                            .ok_or_else(|| BookingQueueError::NotFound("Department not found".to_string()))?;
                        if department.organization_id != scope.organization_id {
                            return Err(BookingQueueError::AccessDenied(
                                "Department belongs to another organization".to_string(),
                            ));
                        }
                        Some(requested)
                    }
                    (None, None) => None,
                };

                Ok(QueueScope {
                    organization_id: scope.organization_id,
                    department_id,
                })
            }
            Actor::Admin { .. } => {
                let department_id = department_id.ok_or_else(|| {
                    BookingQueueError::Validation(ValidationErrors::single(
                        "department_id",
                        "is required for administrators",
                    ))
                })?;
                let department = self
                    .store
                    .department(department_id)
                    .await?
                    .ok_or_else(|| BookingQueueError::NotFound("Department not found".to_string()))?;

                Ok(QueueScope {
                    organization_id: department.organization_id,
                    department_id: Some(department_id),
                })
            }
        }
    }

    /// Non-cancelled appointments for the day, emergencies first, then
    /// by token.
    pub async fn list_queue(
        &self,
        actor: &Actor,
        target: QueueTarget,
    ) -> Result<Vec<QueuedAppointment>, BookingQueueError> {
        let scope = self.resolve_scope(actor, target.department_id).await?;
        let filter = scope
            .filter()
            .doctor(DoctorFilter::optional(target.doctor_id))
            .on(target.date)
            .active_only();

        let rows = self
            .store
            .list_with_queue(&filter, AppointmentOrder::QueuePriority)
            .await?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(index, (appointment, entry))| QueuedAppointment {
                position: index + 1,
                appointment,
                queue_status: entry.map(|e| e.status),
            })
            .collect())
    }

    /// Calls the first booked appointment whose queue entry is waiting.
    /// Entries already called or paused are skipped; losing a race on an
    /// entry moves on to the next candidate.
    pub async fn call_next(
        &self,
        actor: &Actor,
        target: QueueTarget,
    ) -> Result<Appointment, BookingQueueError> {
        let scope = self.resolve_scope(actor, target.department_id).await?;
        let filter = scope
            .filter()
            .doctor(DoctorFilter::optional(target.doctor_id))
            .on(target.date)
            .with_status(AppointmentStatus::Booked);

        let candidates = self
            .store
            .list_with_queue(&filter, AppointmentOrder::QueuePriority)
            .await?;

        let mut saw_paused = false;
        for (appointment, entry) in candidates {
            match entry.map(|e| e.status) {
                Some(QueueStatus::Waiting) => {
                    let called = self
                        .store
                        .transition_queue_entry(appointment.id, &[QueueStatus::Waiting], QueueStatus::Called)
                        .await?;

                    if called.is_none() {
                        debug!("Token {} was taken concurrently", appointment.token_number);
                        continue;
                    }

                    info!(
                        "Called token {} (appointment {}, emergency: {})",
                        appointment.token_number, appointment.id, appointment.is_emergency
                    );
                    self.events.publish(QueueEvent::TokenCalled(TokenCall {
                        appointment_id: appointment.id,
                        token_number: appointment.token_number,
                        organization_id: appointment.organization_id,
                        department_id: appointment.department_id,
                        doctor_id: appointment.doctor_id,
                        is_emergency: appointment.is_emergency,
                    }));
                    self.events.publish(QueueEvent::queue_update(&appointment));
                    return Ok(appointment);
                }
                Some(QueueStatus::Paused) => saw_paused = true,
                Some(QueueStatus::Called) => {}
                None => warn!("Appointment {} has no queue entry", appointment.id),
            }
        }

        if saw_paused {
            Err(BookingQueueError::QueuePaused)
        } else {
            Err(BookingQueueError::QueueEmpty)
        }
    }

    pub async fn pause(&self, actor: &Actor, target: QueueTarget) -> Result<QueueToggle, BookingQueueError> {
        let toggle = self
            .toggle(actor, target, QueueStatus::Waiting, QueueStatus::Paused)
            .await?;
        info!("Paused {} queue entries on {}", toggle.updated_count, toggle.date);
        self.events.publish(QueueEvent::QueuePaused(toggle.clone()));
        Ok(toggle)
    }

    pub async fn resume(&self, actor: &Actor, target: QueueTarget) -> Result<QueueToggle, BookingQueueError> {
        let toggle = self
            .toggle(actor, target, QueueStatus::Paused, QueueStatus::Waiting)
            .await?;
        info!("Resumed {} queue entries on {}", toggle.updated_count, toggle.date);
        self.events.publish(QueueEvent::QueueResumed(toggle.clone()));
        Ok(toggle)
    }

    async fn toggle(
        &self,
        actor: &Actor,
        target: QueueTarget,
        from: QueueStatus,
        to: QueueStatus,
    ) -> Result<QueueToggle, BookingQueueError> {
        let scope = self.resolve_scope(actor, target.department_id).await?;
        let filter = scope
            .filter()
            .doctor(DoctorFilter::optional(target.doctor_id))
            .on(target.date);

        let updated_count = self.store.transition_queue_entries(&filter, from, to).await?;

        Ok(QueueToggle {
            organization_id: scope.organization_id,
            department_id: scope.department_id,
            doctor_id: target.doctor_id,
            date: target.date,
            updated_count,
        })
    }

    pub async fn dashboard(
        &self,
        actor: &Actor,
        department_id: Option<Uuid>,
        date: NaiveDate,
    ) -> Result<QueueDashboard, BookingQueueError> {
        let scope = self.resolve_scope(actor, department_id).await?;
        let appointments = self
            .store
            .list_appointments(&scope.filter().on(date), AppointmentOrder::QueuePriority)
            .await?;

        let count = |status: AppointmentStatus| {
            appointments.iter().filter(|a| a.status == status).count() as u64
        };

        let now_serving = match appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Serving)
            .min_by_key(|a| a.token_number)
        {
            Some(serving) => Some(ServingSummary {
                appointment_id: serving.id,
                token_number: serving.token_number,
                is_emergency: serving.is_emergency,
                patient_name: self.display_name(serving).await?,
            }),
            None => None,
        };

        Ok(QueueDashboard {
            date,
            total: appointments.len() as u64 - count(AppointmentStatus::Cancelled),
            waiting: count(AppointmentStatus::Booked),
            serving: count(AppointmentStatus::Serving),
            completed: count(AppointmentStatus::Completed),
            no_shows: count(AppointmentStatus::NoShow),
            cancelled: count(AppointmentStatus::Cancelled),
            now_serving,
        })
    }

    async fn display_name(&self, appointment: &Appointment) -> Result<Option<String>, BookingQueueError> {
        match &appointment.patient {
            PatientIdentity::WalkIn { name, .. } => Ok(Some(name.clone())),
            PatientIdentity::Registered { user_id } => {
                Ok(self.store.user(*user_id).await?.map(|user| user.name))
            }
        }
    }

    /// Appointments in the caller's scope. A single day is listed in queue
    /// order, otherwise newest day first.
    pub async fn staff_appointments(
        &self,
        actor: &Actor,
        query: &StaffAppointmentQuery,
    ) -> Result<Vec<Appointment>, BookingQueueError> {
        let scope = self.resolve_scope(actor, query.department_id).await?;
        let mut filter = scope.filter().doctor(DoctorFilter::optional(query.doctor_id));
        if let Some(status) = query.status {
            filter = filter.with_status(status);
        }

        let order = match query.date {
            Some(date) => {
                filter = filter.on(date);
                AppointmentOrder::QueuePriority
            }
            None => AppointmentOrder::DateDescTokenAsc,
        };

        Ok(self.store.list_appointments(&filter, order).await?)
    }
}
