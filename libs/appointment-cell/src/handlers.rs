use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::auth::{Caller, Role};
use shared_models::error::AppError;
use shared_utils::extractor::{require_role, resolve_actor};

use crate::models::{
    AppointmentSearchQuery, AvailableDatesQuery, BookAppointmentRequest, SlotQuery,
    UpdateStatusRequest,
};
use crate::router::AppointmentState;
use crate::services::calendar::DEFAULT_LOOKAHEAD_DAYS;

// ==============================================================================
// PUBLIC CATALOGUE HANDLERS
// ==============================================================================

pub async fn list_organizations(
    State(state): State<AppointmentState>,
) -> Result<Json<Value>, AppError> {
    let organizations = state.calendar.organizations().await?;
    Ok(Json(json!({ "organizations": organizations })))
}

pub async fn list_departments(
    State(state): State<AppointmentState>,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let departments = state.calendar.departments(organization_id).await?;
    Ok(Json(json!({ "departments": departments })))
}

pub async fn list_department_doctors(
    State(state): State<AppointmentState>,
    Path(department_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.calendar.doctors(department_id).await?;
    Ok(Json(json!({ "doctors": doctors })))
}

pub async fn get_available_slots(
    State(state): State<AppointmentState>,
    Path(department_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state
        .calendar
        .list_slots(department_id, query.date, query.doctor_id)
        .await?;

    Ok(Json(json!({
        "department_id": department_id,
        "date": query.date,
        "slots": slots
    })))
}

pub async fn get_available_dates(
    State(state): State<AppointmentState>,
    Path(department_id): Path<Uuid>,
    Query(query): Query<AvailableDatesQuery>,
) -> Result<Json<Value>, AppError> {
    let from = query.from.unwrap_or_else(|| Utc::now().date_naive());
    let days = query.days.unwrap_or(DEFAULT_LOOKAHEAD_DAYS);

    let dates = state
        .calendar
        .available_dates(department_id, from, days, query.doctor_id)
        .await?;

    Ok(Json(json!({
        "department_id": department_id,
        "dates": dates
    })))
}

// ==============================================================================
// AUTHENTICATED BOOKING HANDLERS
// ==============================================================================

pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("Booking request from {} for department {}", caller.id, request.department_id);

    let actor = resolve_actor(state.store.as_ref(), &caller).await?;
    let appointment = state.admission.admit(&actor, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "token_number": appointment.token_number
        })),
    ))
}

pub async fn my_appointments(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, AppError> {
    let actor = resolve_actor(state.store.as_ref(), &caller).await?;
    let appointments = state.history.my_appointments(&actor).await?;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments
    })))
}

pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = resolve_actor(state.store.as_ref(), &caller).await?;
    let appointment = state.lifecycle.cancel(&actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

// ==============================================================================
// STAFF HANDLERS
// ==============================================================================

pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&caller, &[Role::Staff, Role::Admin])?;
    let actor = resolve_actor(state.store.as_ref(), &caller).await?;

    let appointment = state
        .lifecycle
        .update_status(&actor, appointment_id, request.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn mark_no_show(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&caller, &[Role::Staff, Role::Admin])?;
    let actor = resolve_actor(state.store.as_ref(), &caller).await?;

    let appointment = state.lifecycle.mark_no_show(&actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

pub async fn book_emergency(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    Json(mut request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&caller, &[Role::Admin])?;
    let actor = resolve_actor(state.store.as_ref(), &caller).await?;

    request.is_emergency = true;
    let appointment = state.admission.admit(&actor, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "token_number": appointment.token_number
        })),
    ))
}

pub async fn list_all_appointments(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&caller, &[Role::Admin])?;
    let actor = resolve_actor(state.store.as_ref(), &caller).await?;

    let appointments = state.history.all_appointments(&actor, &query).await?;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments
    })))
}
