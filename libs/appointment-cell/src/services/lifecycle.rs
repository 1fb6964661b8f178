use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use booking_queue_cell::{EventPublisher, QueueEvent};
use shared_database::ClinicStore;
use shared_models::appointment::{Appointment, AppointmentStatus, QueueStatus};
use shared_models::auth::Actor;

use crate::models::AppointmentError;

/// Appointment state machine. Every move is a compare-and-set on the
/// status the caller saw, so concurrent staff actions cannot both win.
pub struct LifecycleService {
    store: Arc<dyn ClinicStore>,
    events: Arc<dyn EventPublisher>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn ClinicStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current {
            AppointmentStatus::Booked => &[
                AppointmentStatus::Serving,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Serving => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled, // Staff only
                AppointmentStatus::NoShow,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow => &[],
        }
    }

    pub fn validate_transition(
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if Self::valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            warn!("Invalid status transition attempted: {} -> {}", from, to);
            Err(AppointmentError::InvalidTransition { from, to })
        }
    }

    pub async fn start_serving(&self, actor: &Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.load_managed(actor, id).await?;
        if appointment.status != AppointmentStatus::Booked {
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                to: AppointmentStatus::Serving,
            });
        }

        let serving = self.apply(appointment, AppointmentStatus::Serving).await?;

        let called = self
            .store
            .transition_queue_entry(serving.id, &[QueueStatus::Waiting, QueueStatus::Paused], QueueStatus::Called)
            .await?;
        if called.is_none() {
            debug!("Queue entry for {} was already called", serving.id);
        }

        Ok(serving)
    }

    pub async fn complete(&self, actor: &Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.load_managed(actor, id).await?;
        if appointment.status != AppointmentStatus::Serving {
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                to: AppointmentStatus::Completed,
            });
        }
        self.apply(appointment, AppointmentStatus::Completed).await
    }

    /// Patients may cancel their own booked appointments; staff and admins
    /// may cancel anything not yet finished within their scope.
    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = match actor {
            Actor::Patient { user_id, .. } => {
                let appointment = self.load(id).await?;
                if appointment.user_id() != Some(*user_id) {
                    warn!("User {} tried to cancel appointment {} they do not own", user_id, id);
                    return Err(AppointmentError::AccessDenied(
                        "You can only cancel your own appointments".to_string(),
                    ));
                }
                if appointment.status != AppointmentStatus::Booked {
                    return Err(AppointmentError::InvalidTransition {
                        from: appointment.status,
                        to: AppointmentStatus::Cancelled,
                    });
                }
                appointment
            }
            Actor::Staff { .. } | Actor::Admin { .. } => self.load_managed(actor, id).await?,
        };

        Self::validate_transition(appointment.status, AppointmentStatus::Cancelled)?;
        self.apply(appointment, AppointmentStatus::Cancelled).await
    }

    pub async fn mark_no_show(&self, actor: &Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.load_managed(actor, id).await?;
        Self::validate_transition(appointment.status, AppointmentStatus::NoShow)?;
        self.apply(appointment, AppointmentStatus::NoShow).await
    }

    /// Dispatches a requested target status to the matching transition.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        match status {
            AppointmentStatus::Serving => self.start_serving(actor, id).await,
            AppointmentStatus::Completed => self.complete(actor, id).await,
            AppointmentStatus::Cancelled => self.cancel(actor, id).await,
            AppointmentStatus::NoShow => self.mark_no_show(actor, id).await,
            AppointmentStatus::Booked => {
                let appointment = self.load_managed(actor, id).await?;
                Err(AppointmentError::InvalidTransition {
                    from: appointment.status,
                    to: AppointmentStatus::Booked,
                })
            }
        }
    }

    async fn load(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .appointment(id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound("Appointment".to_string()))
    }

    /// Loads an appointment a staff member or admin is allowed to act on.
    async fn load_managed(&self, actor: &Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        if !actor.is_privileged() {
            return Err(AppointmentError::AccessDenied(
                "Staff or admin role required".to_string(),
            ));
        }

        let appointment = self.load(id).await?;
        if !actor.can_manage(appointment.organization_id, appointment.department_id) {
            warn!(
                "User {} denied access to appointment {} in department {}",
                actor.user_id(),
                id,
                appointment.department_id
            );
            return Err(AppointmentError::AccessDenied(
                "Appointment is outside your assignment".to_string(),
            ));
        }
        Ok(appointment)
    }

    async fn apply(
        &self,
        appointment: Appointment,
        to: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let from = appointment.status;
        let updated = match self.store.transition_appointment(appointment.id, from, to).await? {
            Some(updated) => updated,
            None => {
                // Lost a race: report against whatever status won.
                let current = self.load(appointment.id).await?;
                return Err(AppointmentError::InvalidTransition {
                    from: current.status,
                    to,
                });
            }
        };

        info!("Appointment {} moved {} -> {}", updated.id, from, to);

        let event = match to {
            AppointmentStatus::NoShow => QueueEvent::AppointmentNoShow(updated.clone()),
            _ => QueueEvent::AppointmentUpdated(updated.clone()),
        };
        self.events.publish(event);
        self.events.publish(QueueEvent::queue_update(&updated));

        Ok(updated)
    }
}
