use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{ClinicStore, InMemoryStore};
use shared_models::auth::{Actor, Caller, Role, StaffScope};
use shared_models::clinic::{Department, Doctor, Organization, OrganizationType, Staff, User};

pub struct TestConfig {
    pub jwt_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: Role::User,
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn with_id(id: Uuid, email: &str, role: Role) -> Self {
        Self { id, email: email.to_string(), role }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::User)
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, Role::Staff)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_caller(&self) -> Caller {
        Caller {
            id: self.id,
            email: Some(self.email.clone()),
            role: self.role,
            issued_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role.to_string(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Seeded in-memory clinic: one organization, one department, one doctor.
pub struct ClinicFixture {
    pub store: Arc<InMemoryStore>,
    pub organization: Organization,
    pub department: Department,
    pub doctor: Doctor,
}

impl ClinicFixture {
    pub async fn seeded(max_appointments_per_slot: u32, slot_duration_minutes: u32) -> Self {
        let store = Arc::new(InMemoryStore::new());

        let organization = store
            .insert_organization(Organization {
                id: Uuid::new_v4(),
                name: "City Clinic".to_string(),
                kind: OrganizationType::Clinic,
                is_deleted: false,
                created_at: Utc::now(),
            })
            .await
            .expect("seed organization");

        let mut fixture = Self {
            store,
            organization,
            department: placeholder_department(),
            doctor: placeholder_doctor(),
        };

        fixture.department = fixture
            .add_department("General Medicine", max_appointments_per_slot, slot_duration_minutes)
            .await;
        fixture.doctor = fixture.add_doctor(fixture.department.id).await;
        fixture
    }

    pub fn dyn_store(&self) -> Arc<dyn ClinicStore> {
        self.store.clone()
    }

    pub fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 14).expect("valid date")
    }

    pub async fn add_department(
        &self,
        name: &str,
        max_appointments_per_slot: u32,
        slot_duration_minutes: u32,
    ) -> Department {
        self.store
            .insert_department(Department {
                id: Uuid::new_v4(),
                name: name.to_string(),
                organization_id: self.organization.id,
                slot_duration_minutes,
                max_appointments_per_slot,
                is_deleted: false,
                created_at: Utc::now(),
            })
            .await
            .expect("seed department")
    }

    pub async fn add_doctor(&self, department_id: Uuid) -> Doctor {
        self.store
            .insert_doctor(Doctor {
                id: Uuid::new_v4(),
                name: format!("Dr. {}", &Uuid::new_v4().to_string()[..6]),
                email: None,
                specialization: "General Practice".to_string(),
                organization_id: self.organization.id,
                department_id,
                is_active: true,
                is_deleted: false,
                created_at: Utc::now(),
            })
            .await
            .expect("seed doctor")
    }

    pub async fn add_patient(&self, email: &str) -> User {
        self.store
            .insert_user(User {
                id: Uuid::new_v4(),
                name: "Test Patient".to_string(),
                email: email.to_string(),
                password_hash: None,
                role: Role::User,
                external_id: None,
                is_deleted: false,
                created_at: Utc::now(),
            })
            .await
            .expect("seed patient")
    }

    pub async fn add_staff(&self, department_id: Option<Uuid>) -> (User, Staff) {
        let user = User {
            id: Uuid::new_v4(),
            name: "Front Desk".to_string(),
            email: format!("staff-{}@example.com", Uuid::new_v4()),
            password_hash: None,
            role: Role::Staff,
            external_id: None,
            is_deleted: false,
            created_at: Utc::now(),
        };
        let staff = Staff {
            id: Uuid::new_v4(),
            user_id: user.id,
            organization_id: self.organization.id,
            department_id,
            position: Some("Receptionist".to_string()),
            created_at: Utc::now(),
        };
        self.store
            .insert_staff_account(user, staff)
            .await
            .expect("seed staff")
    }

    pub fn patient_actor(user: &User) -> Actor {
        Actor::Patient { user_id: user.id, email: Some(user.email.clone()) }
    }

    pub fn staff_actor(&self, department_id: Option<Uuid>) -> Actor {
        Actor::Staff {
            user_id: Uuid::new_v4(),
            scope: StaffScope {
                organization_id: self.organization.id,
                department_id,
            },
        }
    }

    pub fn admin_actor() -> Actor {
        Actor::Admin { user_id: Uuid::new_v4() }
    }
}

fn placeholder_department() -> Department {
    Department {
        id: Uuid::nil(),
        name: String::new(),
        organization_id: Uuid::nil(),
        slot_duration_minutes: 1,
        max_appointments_per_slot: 1,
        is_deleted: false,
        created_at: Utc::now(),
    }
}

fn placeholder_doctor() -> Doctor {
    Doctor {
        id: Uuid::nil(),
        name: String::new(),
        email: None,
        specialization: String::new(),
        organization_id: Uuid::nil(),
        department_id: Uuid::nil(),
        is_active: false,
        is_deleted: false,
        created_at: Utc::now(),
    }
}
