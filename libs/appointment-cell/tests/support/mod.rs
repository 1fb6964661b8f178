#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::{AppointmentState, BookAppointmentRequest};
use booking_queue_cell::{
    BroadcastPublisher, ConfirmationSender, EventReceiver, NotificationDispatcher, QueueService,
};
use shared_database::{
    AppointmentFilter, AppointmentOrder, ClinicStore, DoctorQuery, InMemoryStore, StoreResult,
};
use shared_models::appointment::{
    Appointment, AppointmentStatus, BookingScope, DoctorFilter, PatientIdentity, QueueEntry, QueueStatus,
};
use shared_models::auth::Role;
use shared_models::clinic::{Department, Doctor, Organization, Staff, User};
use shared_utils::test_utils::{ClinicFixture, TestConfig};

/// Records every confirmation it is asked to deliver.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, Uuid)>>,
    pub fail: bool,
}

#[async_trait]
impl ConfirmationSender for RecordingSender {
    async fn send_booking_confirmation(&self, email: &str, appointment: &Appointment) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((email.to_string(), appointment.id));
        if self.fail {
            anyhow::bail!("delivery refused");
        }
        Ok(())
    }
}

pub struct Harness {
    pub fixture: ClinicFixture,
    pub events: Arc<BroadcastPublisher>,
    pub sender: Arc<RecordingSender>,
    pub state: AppointmentState,
    pub queue: Arc<QueueService>,
}

impl Harness {
    pub async fn new(max_per_slot: u32, slot_minutes: u32) -> Self {
        Self::with_sender(max_per_slot, slot_minutes, RecordingSender::default()).await
    }

    pub async fn with_sender(max_per_slot: u32, slot_minutes: u32, sender: RecordingSender) -> Self {
        let fixture = ClinicFixture::seeded(max_per_slot, slot_minutes).await;
        let store = fixture.dyn_store();
        Self::assemble(fixture, store, sender)
    }

    /// Bookings go through a [`ContendedStore`] that loses `races` token races.
    pub async fn contended(max_per_slot: u32, slot_minutes: u32, races: u32) -> (Self, Arc<ContendedStore>) {
        let fixture = ClinicFixture::seeded(max_per_slot, slot_minutes).await;
        let store = Arc::new(ContendedStore::new(fixture.store.clone(), races));
        let harness = Self::assemble(fixture, store.clone(), RecordingSender::default());
        (harness, store)
    }

    fn assemble(fixture: ClinicFixture, store: Arc<dyn ClinicStore>, sender: RecordingSender) -> Self {
        let events = Arc::new(BroadcastPublisher::new(256));
        let sender = Arc::new(sender);
        let state = AppointmentState::new(
            TestConfig::default().to_arc(),
            store.clone(),
            events.clone(),
            NotificationDispatcher::new(sender.clone()),
        );
        let queue = Arc::new(QueueService::new(store, events.clone()));
        Self { fixture, events, sender, state, queue }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn date(&self) -> NaiveDate {
        ClinicFixture::date()
    }

    /// Request for the seeded department and doctor; identity left blank.
    pub fn request(&self, time_slot: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            organization_id: self.fixture.organization.id,
            department_id: self.fixture.department.id,
            doctor_id: Some(self.fixture.doctor.id),
            date: self.date(),
            time_slot: Some(time_slot.to_string()),
            user_id: None,
            patient_name: None,
            patient_phone: None,
            is_emergency: false,
        }
    }

    pub fn walk_in(&self, time_slot: &str, n: usize) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_name: Some(format!("Walk-in {}", n)),
            patient_phone: Some(format!("555-{:04}", n)),
            ..self.request(time_slot)
        }
    }
}

/// Store where another desk grabs the same token just before each of the
/// next `races` booking inserts lands.
pub struct ContendedStore {
    inner: Arc<InMemoryStore>,
    races: AtomicU32,
    pub rivals: AtomicU32,
}

impl ContendedStore {
    pub fn new(inner: Arc<InMemoryStore>, races: u32) -> Self {
        Self { inner, races: AtomicU32::new(races), rivals: AtomicU32::new(0) }
    }

    async fn book_rival(&self, appointment: &Appointment) -> StoreResult<()> {
        let n = self.rivals.fetch_add(1, Ordering::SeqCst) + 1;
        let rival = Appointment {
            id: Uuid::new_v4(),
            patient: PatientIdentity::WalkIn {
                name: format!("Front desk walk-in {}", n),
                phone: format!("777-{:04}", n),
            },
            ..appointment.clone()
        };
        self.inner.insert_booking(rival.clone(), QueueEntry::waiting(rival.id)).await?;
        Ok(())
    }
}

#[async_trait]
impl ClinicStore for ContendedStore {
    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization> {
        self.inner.insert_organization(organization).await
    }
    async fn organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        self.inner.organization(id).await
    }
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        self.inner.list_organizations().await
    }
    async fn soft_delete_organization(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.soft_delete_organization(id).await
    }

    async fn insert_department(&self, department: Department) -> StoreResult<Department> {
        self.inner.insert_department(department).await
    }
    async fn department(&self, id: Uuid) -> StoreResult<Option<Department>> {
        self.inner.department(id).await
    }
    async fn list_departments(&self, organization_id: Uuid) -> StoreResult<Vec<Department>> {
        self.inner.list_departments(organization_id).await
    }
    async fn update_department(&self, department: Department) -> StoreResult<Department> {
        self.inner.update_department(department).await
    }
    async fn soft_delete_department(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.soft_delete_department(id).await
    }

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        self.inner.insert_doctor(doctor).await
    }
    async fn doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        self.inner.doctor(id).await
    }
    async fn list_doctors(&self, query: &DoctorQuery) -> StoreResult<Vec<Doctor>> {
        self.inner.list_doctors(query).await
    }
    async fn update_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        self.inner.update_doctor(doctor).await
    }
    async fn soft_delete_doctor(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.soft_delete_doctor(id).await
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        self.inner.insert_user(user).await
    }
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.user(id).await
    }
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_users().await
    }
    async fn update_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        self.inner.update_user_role(id, role).await
    }
    async fn deactivate_user(&self, id: Uuid) -> StoreResult<u64> {
        self.inner.deactivate_user(id).await
    }
    async fn insert_staff_account(&self, user: User, staff: Staff) -> StoreResult<(User, Staff)> {
        self.inner.insert_staff_account(user, staff).await
    }
    async fn staff_for_user(&self, user_id: Uuid) -> StoreResult<Option<Staff>> {
        self.inner.staff_for_user(user_id).await
    }

    async fn find_active_booking(
        &self,
        patient: &PatientIdentity,
        department_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<Appointment>> {
        self.inner.find_active_booking(patient, department_id, date).await
    }
    async fn count_active_in_slot(
        &self,
        department_id: Uuid,
        doctor: DoctorFilter,
        date: NaiveDate,
        time_slot: &str,
    ) -> StoreResult<u32> {
        self.inner.count_active_in_slot(department_id, doctor, date, time_slot).await
    }
    async fn active_counts_by_slot(
        &self,
        department_id: Uuid,
        doctor: DoctorFilter,
        date: NaiveDate,
    ) -> StoreResult<HashMap<String, u32>> {
        self.inner.active_counts_by_slot(department_id, doctor, date).await
    }
    async fn max_token(&self, scope: &BookingScope) -> StoreResult<Option<u32>> {
        self.inner.max_token(scope).await
    }
    async fn insert_booking(&self, appointment: Appointment, entry: QueueEntry) -> StoreResult<Appointment> {
        let raced = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if raced {
            self.book_rival(&appointment).await?;
        }
        self.inner.insert_booking(appointment, entry).await
    }

    async fn appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        self.inner.appointment(id).await
    }
    async fn queue_entry(&self, appointment_id: Uuid) -> StoreResult<Option<QueueEntry>> {
        self.inner.queue_entry(appointment_id).await
    }
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        order: AppointmentOrder,
    ) -> StoreResult<Vec<Appointment>> {
        self.inner.list_appointments(filter, order).await
    }
    async fn list_with_queue(
        &self,
        filter: &AppointmentFilter,
        order: AppointmentOrder,
    ) -> StoreResult<Vec<(Appointment, Option<QueueEntry>)>> {
        self.inner.list_with_queue(filter, order).await
    }
    async fn count_appointments(&self, filter: &AppointmentFilter) -> StoreResult<u64> {
        self.inner.count_appointments(filter).await
    }

    async fn transition_appointment(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> StoreResult<Option<Appointment>> {
        self.inner.transition_appointment(id, from, to).await
    }
    async fn transition_queue_entry(
        &self,
        appointment_id: Uuid,
        from: &[QueueStatus],
        to: QueueStatus,
    ) -> StoreResult<Option<QueueEntry>> {
        self.inner.transition_queue_entry(appointment_id, from, to).await
    }
    async fn transition_queue_entries(
        &self,
        filter: &AppointmentFilter,
        from: QueueStatus,
        to: QueueStatus,
    ) -> StoreResult<u64> {
        self.inner.transition_queue_entries(filter, from, to).await
    }
}
