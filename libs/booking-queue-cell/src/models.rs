use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus, QueueStatus};
use shared_models::auth::Actor;

// ==============================================================================
// REAL-TIME EVENTS
// ==============================================================================

/// Live-refresh events fanned out to subscribers. Wire shape is
/// `{"event": <name>, "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum QueueEvent {
    #[serde(rename = "newAppointment")]
    NewAppointment(Appointment),
    #[serde(rename = "appointmentUpdated")]
    AppointmentUpdated(Appointment),
    #[serde(rename = "appointmentNoShow")]
    AppointmentNoShow(Appointment),
    #[serde(rename = "queueUpdate")]
    QueueUpdate(QueueCoordinates),
    #[serde(rename = "tokenCalled")]
    TokenCalled(TokenCall),
    #[serde(rename = "queuePaused")]
    QueuePaused(QueueToggle),
    #[serde(rename = "queueResumed")]
    QueueResumed(QueueToggle),
}

impl QueueEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::NewAppointment(_) => "newAppointment",
            QueueEvent::AppointmentUpdated(_) => "appointmentUpdated",
            QueueEvent::AppointmentNoShow(_) => "appointmentNoShow",
            QueueEvent::QueueUpdate(_) => "queueUpdate",
            QueueEvent::TokenCalled(_) => "tokenCalled",
            QueueEvent::QueuePaused(_) => "queuePaused",
            QueueEvent::QueueResumed(_) => "queueResumed",
        }
    }

    pub fn queue_update(appointment: &Appointment) -> Self {
        QueueEvent::QueueUpdate(QueueCoordinates::from(appointment))
    }

    /// Organization and, when the event is about a single department,
    /// that department.
    pub fn scope(&self) -> (Uuid, Option<Uuid>) {
        match self {
            QueueEvent::NewAppointment(a) | QueueEvent::AppointmentUpdated(a) | QueueEvent::AppointmentNoShow(a) => {
                (a.organization_id, Some(a.department_id))
            }
            QueueEvent::QueueUpdate(c) => (c.organization_id, Some(c.department_id)),
            QueueEvent::TokenCalled(call) => (call.organization_id, Some(call.department_id)),
            QueueEvent::QueuePaused(t) | QueueEvent::QueueResumed(t) => (t.organization_id, t.department_id),
        }
    }

    /// Admins see everything; staff see events for their organization,
    /// narrowed to their department when they have one. An
    /// organization-wide toggle reaches every department.
    pub fn visible_to(&self, actor: &Actor) -> bool {
        match actor {
            Actor::Admin { .. } => true,
            Actor::Staff { scope, .. } => {
                let (organization_id, department_id) = self.scope();
                organization_id == scope.organization_id
                    && match (department_id, scope.department_id) {
                        (Some(event), Some(fixed)) => event == fixed,
                        _ => true,
                    }
            }
            Actor::Patient { .. } => false,
        }
    }
}

/// Identifies the queue view a subscriber should re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCoordinates {
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
}

impl From<&Appointment> for QueueCoordinates {
    fn from(appointment: &Appointment) -> Self {
        Self {
            organization_id: appointment.organization_id,
            department_id: appointment.department_id,
            doctor_id: appointment.doctor_id,
            date: appointment.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCall {
    pub appointment_id: Uuid,
    pub token_number: u32,
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub is_emergency: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueToggle {
    pub organization_id: Uuid,
    pub department_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub updated_count: u64,
}

// ==============================================================================
// QUEUE REQUESTS & VIEWS
// ==============================================================================

/// Which queue a staff action addresses. A missing doctor means every
/// doctor in the department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTarget {
    pub department_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedAppointment {
    pub position: usize,
    #[serde(flatten)]
    pub appointment: Appointment,
    pub queue_status: Option<QueueStatus>,
}

/// Staff listing filter; every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffAppointmentQuery {
    pub date: Option<NaiveDate>,
    pub department_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingSummary {
    pub appointment_id: Uuid,
    pub token_number: u32,
    pub is_emergency: bool,
    pub patient_name: Option<String>,
}

/// Per-day counters for a staff member's scope. `total` leaves out
/// cancelled appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDashboard {
    pub date: NaiveDate,
    pub total: u64,
    pub waiting: u64,
    pub serving: u64,
    pub completed: u64,
    pub no_shows: u64,
    pub cancelled: u64,
    pub now_serving: Option<ServingSummary>,
}
