use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Staff,
    Admin,
}

impl Role {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Staff => write!(f, "STAFF"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" | "PATIENT" => Ok(Role::User),
            "STAFF" => Ok(Role::Staff),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Identity resolved from a validated bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub issued_at: Option<DateTime<Utc>>,
}

/// Departments a staff member may operate on. `department_id == None`
/// grants every department of the organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffScope {
    pub organization_id: Uuid,
    pub department_id: Option<Uuid>,
}

impl StaffScope {
    pub fn covers(&self, organization_id: Uuid, department_id: Uuid) -> bool {
        self.organization_id == organization_id
            && self.department_id.map_or(true, |fixed| fixed == department_id)
    }
}

/// Caller plus whatever scope the operation is allowed to touch.
#[derive(Debug, Clone)]
pub enum Actor {
    Patient { user_id: Uuid, email: Option<String> },
    Staff { user_id: Uuid, scope: StaffScope },
    Admin { user_id: Uuid },
}

impl Actor {
    pub fn user_id(&self) -> Uuid {
        match self {
            Actor::Patient { user_id, .. } => *user_id,
            Actor::Staff { user_id, .. } => *user_id,
            Actor::Admin { user_id } => *user_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Patient { .. } => Role::User,
            Actor::Staff { .. } => Role::Staff,
            Actor::Admin { .. } => Role::Admin,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role().is_privileged()
    }

    pub fn staff_scope(&self) -> Option<&StaffScope> {
        match self {
            Actor::Staff { scope, .. } => Some(scope),
            _ => None,
        }
    }

    /// Whether this actor may operate on records of the given department.
    /// Patients never pass; ownership checks for them happen elsewhere.
    pub fn can_manage(&self, organization_id: Uuid, department_id: Uuid) -> bool {
        match self {
            Actor::Admin { .. } => true,
            Actor::Staff { scope, .. } => scope.covers(organization_id, department_id),
            Actor::Patient { .. } => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}
