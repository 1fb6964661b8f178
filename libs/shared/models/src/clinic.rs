use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;
use crate::SoftDelete;

// ==============================================================================
// ORGANIZATIONS & DEPARTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationType {
    Clinic,
    Office,
}

impl fmt::Display for OrganizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizationType::Clinic => write!(f, "CLINIC"),
            OrganizationType::Office => write!(f, "OFFICE"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OrganizationType,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Defines the slot grid and per-slot capacity for its appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
    pub slot_duration_minutes: u32,
    pub max_appointments_per_slot: u32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// PEOPLE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub specialization: String,
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    /// Bookable: visible, active and attached to `department_id`.
    pub fn accepts_bookings_for(&self, department_id: Uuid) -> bool {
        self.is_visible() && self.is_active && self.department_id == department_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// OAuth-only accounts have no password.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub external_id: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub department_id: Option<Uuid>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SoftDelete for Organization {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl SoftDelete for Department {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl SoftDelete for Doctor {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl SoftDelete for User {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}
