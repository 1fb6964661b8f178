use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use shared_database::{ClinicStore, DoctorQuery};
use shared_models::appointment::DoctorFilter;
use shared_models::clinic::{Department, Doctor, Organization};

use crate::models::{AppointmentError, SlotAvailability};

/// Workday bounds in minutes since midnight.
pub const WORKDAY_START: u32 = 9 * 60;
pub const WORKDAY_END: u32 = 17 * 60;
/// Longest slot that still fits one workday.
pub const MAX_SLOT_DURATION_MINUTES: u32 = WORKDAY_END - WORKDAY_START;

pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 30;
pub const MAX_LOOKAHEAD_DAYS: u32 = 90;

/// The day's slot start labels (`HH:MM`). Slots that would run past the
/// end of the workday are left out.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    next: u32,
    step: u32,
}

impl SlotGrid {
    pub fn new(slot_duration_minutes: u32) -> Self {
        Self {
            next: WORKDAY_START,
            step: slot_duration_minutes,
        }
    }

    pub fn for_department(department: &Department) -> Self {
        Self::new(department.slot_duration_minutes)
    }

    pub fn contains(&self, time_slot: &str) -> bool {
        self.clone().any(|label| label == time_slot)
    }
}

impl Iterator for SlotGrid {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step == 0 {
            return None;
        }
        let end = self.next.checked_add(self.step).filter(|end| *end <= WORKDAY_END)?;
        let label = format!("{:02}:{:02}", self.next / 60, self.next % 60);
        self.next = end;
        Some(label)
    }
}

/// Read side of booking: what can be booked and how full it is.
pub struct CalendarService {
    store: Arc<dyn ClinicStore>,
}

impl CalendarService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    pub async fn organizations(&self) -> Result<Vec<Organization>, AppointmentError> {
        Ok(self.store.list_organizations().await?)
    }

    pub async fn departments(&self, organization_id: Uuid) -> Result<Vec<Department>, AppointmentError> {
        if self.store.organization(organization_id).await?.is_none() {
            return Err(AppointmentError::NotFound("Organization".to_string()));
        }
        Ok(self.store.list_departments(organization_id).await?)
    }

    /// Active doctors taking bookings in the department.
    pub async fn doctors(&self, department_id: Uuid) -> Result<Vec<Doctor>, AppointmentError> {
        let department = self.department(department_id).await?;
        let query = DoctorQuery {
            organization_id: Some(department.organization_id),
            department_id: Some(department.id),
            name_contains: None,
        };
        let doctors = self.store.list_doctors(&query).await?;
        Ok(doctors.into_iter().filter(|d| d.is_active).collect())
    }

    /// Remaining capacity per slot, recomputed from the store on every
    /// call. Without a doctor the whole department is counted.
    pub async fn list_slots(
        &self,
        department_id: Uuid,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
    ) -> Result<Vec<SlotAvailability>, AppointmentError> {
        let department = self.department(department_id).await?;
        self.slots_for(&department, date, doctor_id).await
    }

    /// Days from `from` onwards that still have at least one open slot.
    pub async fn available_dates(
        &self,
        department_id: Uuid,
        from: NaiveDate,
        days: u32,
        doctor_id: Option<Uuid>,
    ) -> Result<Vec<NaiveDate>, AppointmentError> {
        let department = self.department(department_id).await?;
        let days = days.clamp(1, MAX_LOOKAHEAD_DAYS);

        let mut dates = Vec::new();
        for offset in 0..days {
            // Stop at the end of the calendar.
            let Some(date) = from.checked_add_days(Days::new(offset.into())) else {
                break;
            };
            let slots = self.slots_for(&department, date, doctor_id).await?;
            if slots.iter().any(|slot| slot.available) {
                dates.push(date);
            }
        }

        debug!("{} of {} days open in department {}", dates.len(), days, department_id);
        Ok(dates)
    }

    async fn department(&self, department_id: Uuid) -> Result<Department, AppointmentError> {
        self.store
            .department(department_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound("Department".to_string()))
    }

    async fn slots_for(
        &self,
        department: &Department,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
    ) -> Result<Vec<SlotAvailability>, AppointmentError> {
        let counts = self
            .store
            .active_counts_by_slot(department.id, DoctorFilter::optional(doctor_id), date)
            .await?;

        Ok(SlotGrid::for_department(department)
            .map(|time_slot| {
                let booked = counts.get(&time_slot).copied().unwrap_or(0);
                let remaining = department.max_appointments_per_slot.saturating_sub(booked);
                SlotAvailability {
                    time_slot,
                    remaining,
                    available: remaining > 0,
                }
            })
            .collect())
    }
}
