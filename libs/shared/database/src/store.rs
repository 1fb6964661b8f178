use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::{
    Appointment, AppointmentStatus, BookingScope, DoctorFilter, PatientIdentity, QueueEntry,
    QueueStatus,
};
use shared_models::auth::Role;
use shared_models::clinic::{Department, Doctor, Organization, Staff, User};
use shared_models::SoftDelete;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Token {token} already issued in scope {scope}")]
    TokenConflict { scope: BookingScope, token: u32 },

    #[error("An active booking already exists for {0}")]
    DuplicateIdentity(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

// ==============================================================================
// QUERY SHAPES
// ==============================================================================

/// Exact-field filter over appointments. Soft-deleted rows never match.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub doctor: DoctorFilter,
    pub date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub exclude_cancelled: bool,
}

impl AppointmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn department(mut self, department_id: Option<Uuid>) -> Self {
        self.department_id = department_id;
        self
    }

    pub fn doctor(mut self, doctor: DoctorFilter) -> Self {
        self.doctor = doctor;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn active_only(mut self) -> Self {
        self.exclude_cancelled = true;
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        appointment.is_visible()
            && self.organization_id.map_or(true, |id| appointment.organization_id == id)
            && self.department_id.map_or(true, |id| appointment.department_id == id)
            && self.doctor.matches(appointment.doctor_id)
            && self.date.map_or(true, |date| appointment.date == date)
            && self.user_id.map_or(true, |id| appointment.user_id() == Some(id))
            && self.status.map_or(true, |status| appointment.status == status)
            && !(self.exclude_cancelled && appointment.status == AppointmentStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentOrder {
    /// Emergencies first, then token ascending.
    QueuePriority,
    /// Most recently created first.
    NewestFirst,
    /// Latest day first, token ascending within a day.
    DateDescTokenAsc,
}

impl AppointmentOrder {
    pub fn compare(&self, a: &Appointment, b: &Appointment) -> Ordering {
        match self {
            AppointmentOrder::QueuePriority => b
                .is_emergency
                .cmp(&a.is_emergency)
                .then(a.token_number.cmp(&b.token_number)),
            AppointmentOrder::NewestFirst => b.created_at.cmp(&a.created_at),
            AppointmentOrder::DateDescTokenAsc => b
                .date
                .cmp(&a.date)
                .then(a.token_number.cmp(&b.token_number)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DoctorQuery {
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub name_contains: Option<String>,
}

impl DoctorQuery {
    pub fn matches(&self, doctor: &Doctor) -> bool {
        doctor.is_visible()
            && self.organization_id.map_or(true, |id| doctor.organization_id == id)
            && self.department_id.map_or(true, |id| doctor.department_id == id)
            && self.name_contains.as_ref().map_or(true, |needle| {
                doctor.name.to_lowercase().contains(&needle.to_lowercase())
            })
    }
}

// ==============================================================================
// STORE CONTRACT
// ==============================================================================

/// Transactional relational store as seen by the cells.
///
/// Every read applies [`SoftDelete::is_visible`]. Multi-row writes
/// (`insert_booking`, `insert_staff_account`, `transition_queue_entries`,
/// `deactivate_user`) commit all-or-nothing.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization>;
    async fn organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>>;
    async fn soft_delete_organization(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_department(&self, department: Department) -> StoreResult<Department>;
    async fn department(&self, id: Uuid) -> StoreResult<Option<Department>>;
    async fn list_departments(&self, organization_id: Uuid) -> StoreResult<Vec<Department>>;
    async fn update_department(&self, department: Department) -> StoreResult<Department>;
    async fn soft_delete_department(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor>;
    async fn doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>>;
    async fn list_doctors(&self, query: &DoctorQuery) -> StoreResult<Vec<Doctor>>;
    async fn update_doctor(&self, doctor: Doctor) -> StoreResult<Doctor>;
    async fn soft_delete_doctor(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn update_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>>;
    /// Soft-deletes the user and cascades to their appointments and queue
    /// entries. Returns the number of appointments hidden.
    async fn deactivate_user(&self, id: Uuid) -> StoreResult<u64>;
    async fn insert_staff_account(&self, user: User, staff: Staff) -> StoreResult<(User, Staff)>;
    async fn staff_for_user(&self, user_id: Uuid) -> StoreResult<Option<Staff>>;

    async fn find_active_booking(
        &self,
        patient: &PatientIdentity,
        department_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<Appointment>>;
    async fn count_active_in_slot(
        &self,
        department_id: Uuid,
        doctor: DoctorFilter,
        date: NaiveDate,
        time_slot: &str,
    ) -> StoreResult<u32>;
    async fn active_counts_by_slot(
        &self,
        department_id: Uuid,
        doctor: DoctorFilter,
        date: NaiveDate,
    ) -> StoreResult<HashMap<String, u32>>;
    /// Highest visible token in exactly this scope, cancelled rows included.
    async fn max_token(&self, scope: &BookingScope) -> StoreResult<Option<u32>>;
    /// Inserts the appointment and its queue entry together. Rejects a token
    /// already issued in the scope and a second active booking for the same
    /// identity, department and day.
    async fn insert_booking(&self, appointment: Appointment, entry: QueueEntry) -> StoreResult<Appointment>;

    async fn appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn queue_entry(&self, appointment_id: Uuid) -> StoreResult<Option<QueueEntry>>;
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        order: AppointmentOrder,
    ) -> StoreResult<Vec<Appointment>>;
    async fn list_with_queue(
        &self,
        filter: &AppointmentFilter,
        order: AppointmentOrder,
    ) -> StoreResult<Vec<(Appointment, Option<QueueEntry>)>>;
    async fn count_appointments(&self, filter: &AppointmentFilter) -> StoreResult<u64>;

    /// Compare-and-set on the appointment status. `Ok(None)` when the row is
    /// missing or no longer in `from`.
    async fn transition_appointment(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> StoreResult<Option<Appointment>>;
    /// Compare-and-set on a queue entry.
    async fn transition_queue_entry(
        &self,
        appointment_id: Uuid,
        from: &[QueueStatus],
        to: QueueStatus,
    ) -> StoreResult<Option<QueueEntry>>;
    /// Bulk update of every entry in `from` whose appointment matches.
    async fn transition_queue_entries(
        &self,
        filter: &AppointmentFilter,
        from: QueueStatus,
        to: QueueStatus,
    ) -> StoreResult<u64>;
}
