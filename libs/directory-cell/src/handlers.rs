use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::auth::{Caller, Role};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    CreateDepartmentRequest, CreateDoctorRequest, CreateOrganizationRequest, CreateStaffRequest,
    DoctorSearchQuery, UpdateDepartmentRequest, UpdateDoctorRequest, UpdateRoleRequest,
};
use crate::router::DirectoryState;

fn require_admin(caller: &Caller) -> Result<(), AppError> {
    require_role(caller, &[Role::Admin])
}

// ==============================================================================
// ORGANIZATION HANDLERS
// ==============================================================================

pub async fn create_organization(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&caller)?;
    let organization = state.organizations.create(request).await?;

    Ok((StatusCode::CREATED, Json(json!(organization))))
}

pub async fn list_organizations(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let organizations = state.organizations.list().await?;

    Ok(Json(json!({ "organizations": organizations })))
}

pub async fn delete_organization(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(organization_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.organizations.delete(organization_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// DEPARTMENT HANDLERS
// ==============================================================================

pub async fn create_department(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&caller)?;
    let department = state.departments.create(request).await?;

    Ok((StatusCode::CREATED, Json(json!(department))))
}

pub async fn list_departments(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let departments = state.departments.list(organization_id).await?;

    Ok(Json(json!({ "departments": departments })))
}

pub async fn update_department(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(department_id): Path<Uuid>,
    Json(request): Json<UpdateDepartmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let department = state.departments.update(department_id, request).await?;

    Ok(Json(json!(department)))
}

pub async fn delete_department(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(department_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.departments.delete(department_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

pub async fn create_doctor(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&caller)?;
    let doctor = state.doctors.create(request).await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

pub async fn search_doctors(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let doctors = state.doctors.search(query).await?;

    Ok(Json(json!({
        "total": doctors.len(),
        "doctors": doctors
    })))
}

pub async fn get_doctor(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let doctor = state.doctors.get(doctor_id).await?;

    Ok(Json(json!(doctor)))
}

pub async fn update_doctor(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let doctor = state.doctors.update(doctor_id, request).await?;

    Ok(Json(json!(doctor)))
}

pub async fn delete_doctor(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(doctor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.doctors.delete(doctor_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// ACCOUNT HANDLERS
// ==============================================================================

pub async fn create_staff(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&caller)?;
    info!("Admin {} creating staff account for {}", caller.id, request.email);

    let account = state.accounts.create_staff(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Staff account created successfully",
            "user": account.user,
            "staff": account.staff
        })),
    ))
}

pub async fn list_users(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let users = state.accounts.list_users().await?;

    Ok(Json(json!({
        "total": users.len(),
        "users": users
    })))
}

pub async fn update_user_role(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let user = state.accounts.update_role(user_id, request.role).await?;

    Ok(Json(json!({ "user": user })))
}

pub async fn deactivate_user(
    State(state): State<DirectoryState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller)?;
    let hidden = state.accounts.deactivate_user(user_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointments_hidden": hidden
    })))
}
