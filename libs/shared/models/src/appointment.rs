use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SoftDelete;

/// Time-slot label stored on emergency appointments.
pub const EMERGENCY_SLOT: &str = "EMERGENCY";

// ==============================================================================
// STATUSES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Booked,
    Serving,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "BOOKED"),
            AppointmentStatus::Serving => write!(f, "SERVING"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Waiting,
    Called,
    Paused,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueStatus::Waiting => write!(f, "WAITING"),
            QueueStatus::Called => write!(f, "CALLED"),
            QueueStatus::Paused => write!(f, "PAUSED"),
        }
    }
}

// ==============================================================================
// IDENTITY & SCOPE
// ==============================================================================

/// Who the appointment is for: a registered user or a walk-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatientIdentity {
    Registered { user_id: Uuid },
    WalkIn { name: String, phone: String },
}

impl PatientIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            PatientIdentity::Registered { user_id } => Some(*user_id),
            PatientIdentity::WalkIn { .. } => None,
        }
    }

    pub fn walk_in_name(&self) -> Option<&str> {
        match self {
            PatientIdentity::WalkIn { name, .. } => Some(name.as_str()),
            PatientIdentity::Registered { .. } => None,
        }
    }
}

impl fmt::Display for PatientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientIdentity::Registered { user_id } => write!(f, "user {}", user_id),
            PatientIdentity::WalkIn { name, phone } => write!(f, "walk-in {} ({})", name, phone),
        }
    }
}

/// Bounds token sequencing: one FIFO line per organization, department,
/// doctor (or none) and day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BookingScope {
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
}

impl fmt::Display for BookingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.doctor_id {
            Some(doctor_id) => write!(
                f,
                "{}/{}/{}/{}",
                self.organization_id, self.department_id, doctor_id, self.date
            ),
            None => write!(f, "{}/{}/-/{}", self.organization_id, self.department_id, self.date),
        }
    }
}

/// How a query treats the optional doctor column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoctorFilter {
    /// No restriction.
    #[default]
    Any,
    /// Only department-wide (legacy) appointments without a doctor.
    Unassigned,
    Exactly(Uuid),
}

impl DoctorFilter {
    /// Exact match on an assignment, `None` meaning "no doctor".
    pub fn assigned(doctor_id: Option<Uuid>) -> Self {
        match doctor_id {
            Some(id) => DoctorFilter::Exactly(id),
            None => DoctorFilter::Unassigned,
        }
    }

    /// Optional narrowing, `None` meaning "any doctor".
    pub fn optional(doctor_id: Option<Uuid>) -> Self {
        match doctor_id {
            Some(id) => DoctorFilter::Exactly(id),
            None => DoctorFilter::Any,
        }
    }

    pub fn matches(&self, doctor_id: Option<Uuid>) -> bool {
        match self {
            DoctorFilter::Any => true,
            DoctorFilter::Unassigned => doctor_id.is_none(),
            DoctorFilter::Exactly(id) => doctor_id == Some(*id),
        }
    }
}

// ==============================================================================
// RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient: PatientIdentity,
    pub booked_by_id: Uuid,
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time_slot: String,
    pub token_number: u32,
    pub status: AppointmentStatus,
    pub is_emergency: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn scope(&self) -> BookingScope {
        BookingScope {
            organization_id: self.organization_id,
            department_id: self.department_id,
            doctor_id: self.doctor_id,
            date: self.date,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.patient.user_id()
    }

    /// Counts against slot capacity and the one-per-day identity rule.
    pub fn is_active(&self) -> bool {
        self.is_visible() && self.status != AppointmentStatus::Cancelled
    }
}

/// Queue row paired 1:1 with an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub status: QueueStatus,
    pub is_deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn waiting(appointment_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            appointment_id,
            status: QueueStatus::Waiting,
            is_deleted: false,
            updated_at: Utc::now(),
        }
    }
}

impl SoftDelete for Appointment {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl SoftDelete for QueueEntry {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}
