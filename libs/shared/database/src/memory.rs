use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::appointment::{
    Appointment, AppointmentStatus, BookingScope, DoctorFilter, PatientIdentity, QueueEntry,
    QueueStatus,
};
use shared_models::auth::Role;
use shared_models::clinic::{Department, Doctor, Organization, Staff, User};
use shared_models::SoftDelete;

use crate::store::{
    AppointmentFilter, AppointmentOrder, ClinicStore, DoctorQuery, StoreError, StoreResult,
};

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    departments: HashMap<Uuid, Department>,
    doctors: HashMap<Uuid, Doctor>,
    users: HashMap<Uuid, User>,
    staff: HashMap<Uuid, Staff>,
    appointments: HashMap<Uuid, Appointment>,
    // keyed by appointment id
    queue: HashMap<Uuid, QueueEntry>,
}

impl Tables {
    fn active_for_identity(
        &self,
        patient: &PatientIdentity,
        department_id: Uuid,
        date: NaiveDate,
    ) -> Option<&Appointment> {
        self.appointments.values().find(|a| {
            a.is_active() && &a.patient == patient && a.department_id == department_id && a.date == date
        })
    }

    fn sorted(&self, filter: &AppointmentFilter, order: AppointmentOrder) -> Vec<&Appointment> {
        let mut rows: Vec<&Appointment> =
            self.appointments.values().filter(|a| filter.matches(a)).collect();
        rows.sort_by(|a, b| order.compare(a, b));
        rows
    }
}

/// Process-local [`ClinicStore`]. A single `RwLock` over all tables makes
/// every write method one transaction.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: every call fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            warn!("In-memory store is marked unavailable");
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    // --------------------------------------------------------------------------
    // organizations
    // --------------------------------------------------------------------------

    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        tables.organizations.insert(organization.id, organization.clone());
        debug!("Inserted organization {}", organization.id);
        Ok(organization)
    }

    async fn organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.organizations.get(&id).filter(|o| o.is_visible()).cloned())
    }

    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Organization> =
            tables.organizations.values().filter(|o| o.is_visible()).cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn soft_delete_organization(&self, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.organizations.get_mut(&id).filter(|o| o.is_visible()) {
            Some(org) => {
                org.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --------------------------------------------------------------------------
    // departments
    // --------------------------------------------------------------------------

    async fn insert_department(&self, department: Department) -> StoreResult<Department> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        tables.departments.insert(department.id, department.clone());
        debug!("Inserted department {}", department.id);
        Ok(department)
    }

    async fn department(&self, id: Uuid) -> StoreResult<Option<Department>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.departments.get(&id).filter(|d| d.is_visible()).cloned())
    }

    async fn list_departments(&self, organization_id: Uuid) -> StoreResult<Vec<Department>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Department> = tables
            .departments
            .values()
            .filter(|d| d.is_visible() && d.organization_id == organization_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_department(&self, department: Department) -> StoreResult<Department> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.departments.get_mut(&department.id).filter(|d| d.is_visible()) {
            Some(existing) => {
                *existing = department.clone();
                Ok(department)
            }
            None => Err(StoreError::NotFound(format!("department {}", department.id))),
        }
    }

    async fn soft_delete_department(&self, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.departments.get_mut(&id).filter(|d| d.is_visible()) {
            Some(dept) => {
                dept.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --------------------------------------------------------------------------
    // doctors
    // --------------------------------------------------------------------------

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.doctors.get(&id).filter(|d| d.is_visible()).cloned())
    }

    async fn list_doctors(&self, query: &DoctorQuery) -> StoreResult<Vec<Doctor>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Doctor> =
            tables.doctors.values().filter(|d| query.matches(d)).cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.doctors.get_mut(&doctor.id).filter(|d| d.is_visible()) {
            Some(existing) => {
                *existing = doctor.clone();
                Ok(doctor)
            }
            None => Err(StoreError::NotFound(format!("doctor {}", doctor.id))),
        }
    }

    async fn soft_delete_doctor(&self, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.doctors.get_mut(&id).filter(|d| d.is_visible()) {
            Some(doctor) => {
                doctor.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --------------------------------------------------------------------------
    // users & staff
    // --------------------------------------------------------------------------

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::UniqueViolation(format!("email {}", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).filter(|u| u.is_visible()).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<User> = tables.users.values().filter(|u| u.is_visible()).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).filter(|u| u.is_visible()).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn deactivate_user(&self, id: Uuid) -> StoreResult<u64> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id).filter(|u| u.is_visible()) {
            Some(user) => user.is_deleted = true,
            None => return Err(StoreError::NotFound(format!("user {}", id))),
        }

        let now = Utc::now();
        let hidden: Vec<Uuid> = tables
            .appointments
            .values_mut()
            .filter(|a| a.is_visible() && a.user_id() == Some(id))
            .map(|a| {
                a.is_deleted = true;
                a.updated_at = now;
                a.id
            })
            .collect();

        for appointment_id in &hidden {
            if let Some(entry) = tables.queue.get_mut(appointment_id) {
                entry.is_deleted = true;
                entry.updated_at = now;
            }
        }

        info!("Deactivated user {} and hid {} appointments", id, hidden.len());
        Ok(hidden.len() as u64)
    }

    async fn insert_staff_account(&self, user: User, staff: Staff) -> StoreResult<(User, Staff)> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::UniqueViolation(format!("email {}", user.email)));
        }
        if tables.staff.values().any(|s| s.user_id == staff.user_id) {
            return Err(StoreError::UniqueViolation(format!("staff for user {}", staff.user_id)));
        }
        tables.users.insert(user.id, user.clone());
        tables.staff.insert(staff.id, staff.clone());
        Ok((user, staff))
    }

    async fn staff_for_user(&self, user_id: Uuid) -> StoreResult<Option<Staff>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let user_visible = tables.users.get(&user_id).map_or(false, |u| u.is_visible());
        if !user_visible {
            return Ok(None);
        }
        Ok(tables.staff.values().find(|s| s.user_id == user_id).cloned())
    }

    // --------------------------------------------------------------------------
    // appointments
    // --------------------------------------------------------------------------

    async fn find_active_booking(
        &self,
        patient: &PatientIdentity,
        department_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<Appointment>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.active_for_identity(patient, department_id, date).cloned())
    }

    async fn count_active_in_slot(
        &self,
        department_id: Uuid,
        doctor: DoctorFilter,
        date: NaiveDate,
        time_slot: &str,
    ) -> StoreResult<u32> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let count = tables
            .appointments
            .values()
            .filter(|a| {
                a.is_active()
                    && a.department_id == department_id
                    && doctor.matches(a.doctor_id)
                    && a.date == date
                    && a.time_slot == time_slot
            })
            .count();
        Ok(count as u32)
    }

    async fn active_counts_by_slot(
        &self,
        department_id: Uuid,
        doctor: DoctorFilter,
        date: NaiveDate,
    ) -> StoreResult<HashMap<String, u32>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for appointment in tables.appointments.values().filter(|a| {
            a.is_active() && a.department_id == department_id && doctor.matches(a.doctor_id) && a.date == date
        }) {
            *counts.entry(appointment.time_slot.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn max_token(&self, scope: &BookingScope) -> StoreResult<Option<u32>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .appointments
            .values()
            .filter(|a| a.is_visible() && a.scope() == *scope)
            .map(|a| a.token_number)
            .max())
    }

    async fn insert_booking(&self, appointment: Appointment, entry: QueueEntry) -> StoreResult<Appointment> {
        self.check_available()?;
        if entry.appointment_id != appointment.id {
            return Err(StoreError::NotFound(format!(
                "appointment {} for queue entry {}",
                entry.appointment_id, entry.id
            )));
        }

        let mut tables = self.tables.write().await;
        let scope = appointment.scope();
        let token_taken = tables
            .appointments
            .values()
            .any(|a| a.is_visible() && a.scope() == scope && a.token_number == appointment.token_number);
        if token_taken {
            return Err(StoreError::TokenConflict { scope, token: appointment.token_number });
        }

        if tables
            .active_for_identity(&appointment.patient, appointment.department_id, appointment.date)
            .is_some()
        {
            return Err(StoreError::DuplicateIdentity(appointment.patient.to_string()));
        }

        tables.queue.insert(appointment.id, entry);
        tables.appointments.insert(appointment.id, appointment.clone());
        debug!("Inserted appointment {} with token {} in scope {}", appointment.id, appointment.token_number, scope);
        Ok(appointment)
    }

    async fn appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.appointments.get(&id).filter(|a| a.is_visible()).cloned())
    }

    async fn queue_entry(&self, appointment_id: Uuid) -> StoreResult<Option<QueueEntry>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.queue.get(&appointment_id).filter(|q| q.is_visible()).cloned())
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        order: AppointmentOrder,
    ) -> StoreResult<Vec<Appointment>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.sorted(filter, order).into_iter().cloned().collect())
    }

    async fn list_with_queue(
        &self,
        filter: &AppointmentFilter,
        order: AppointmentOrder,
    ) -> StoreResult<Vec<(Appointment, Option<QueueEntry>)>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .sorted(filter, order)
            .into_iter()
            .map(|a| {
                let entry = tables.queue.get(&a.id).filter(|q| q.is_visible()).cloned();
                (a.clone(), entry)
            })
            .collect())
    }

    async fn count_appointments(&self, filter: &AppointmentFilter) -> StoreResult<u64> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.appointments.values().filter(|a| filter.matches(a)).count() as u64)
    }

    async fn transition_appointment(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> StoreResult<Option<Appointment>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .appointments
            .get_mut(&id)
            .filter(|a| a.is_visible() && a.status == from)
            .map(|a| {
                a.status = to;
                a.updated_at = Utc::now();
                a.clone()
            }))
    }

    async fn transition_queue_entry(
        &self,
        appointment_id: Uuid,
        from: &[QueueStatus],
        to: QueueStatus,
    ) -> StoreResult<Option<QueueEntry>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .queue
            .get_mut(&appointment_id)
            .filter(|q| q.is_visible() && from.contains(&q.status))
            .map(|q| {
                q.status = to;
                q.updated_at = Utc::now();
                q.clone()
            }))
    }

    async fn transition_queue_entries(
        &self,
        filter: &AppointmentFilter,
        from: QueueStatus,
        to: QueueStatus,
    ) -> StoreResult<u64> {
        self.check_available()?;
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let now = Utc::now();
        let mut updated = 0;
        for entry in tables.queue.values_mut() {
            let matches = tables
                .appointments
                .get(&entry.appointment_id)
                .map_or(false, |a| filter.matches(a));
            if matches && entry.is_visible() && entry.status == from {
                entry.status = to;
                entry.updated_at = now;
                updated += 1;
            }
        }
        debug!("Moved {} queue entries from {} to {}", updated, from, to);
        Ok(updated)
    }
}
