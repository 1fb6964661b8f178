use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    Extension,
};
use chrono::{NaiveDate, Utc};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use shared_models::{
    auth::{Actor, Caller, Role},
    error::AppError,
};
use shared_utils::extractor::{require_role, resolve_actor};

use crate::models::{QueueTarget, StaffAppointmentQuery};
use crate::router::QueueState;

const STAFF_ROLES: &[Role] = &[Role::Staff, Role::Admin];

/// Queue coordinates as sent by clients. The date defaults to today.
#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
    pub date: Option<NaiveDate>,
    pub department_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

impl QueueParams {
    pub fn into_target(self) -> QueueTarget {
        QueueTarget {
            department_id: self.department_id,
            doctor_id: self.doctor_id,
            date: self.date.unwrap_or_else(|| Utc::now().date_naive()),
        }
    }
}

async fn staff_actor(state: &QueueState, caller: &Caller) -> Result<Actor, AppError> {
    require_role(caller, STAFF_ROLES)?;
    resolve_actor(state.store.as_ref(), caller).await
}

pub async fn get_queue(
    State(state): State<QueueState>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<QueueParams>,
) -> Result<Json<Value>, AppError> {
    let actor = staff_actor(&state, &caller).await?;
    let target = params.into_target();

    let queue = state.queue.list_queue(&actor, target).await?;

    Ok(Json(json!({
        "date": target.date,
        "total": queue.len(),
        "queue": queue
    })))
}

pub async fn call_next(
    State(state): State<QueueState>,
    Extension(caller): Extension<Caller>,
    Json(params): Json<QueueParams>,
) -> Result<Json<Value>, AppError> {
    let actor = staff_actor(&state, &caller).await?;
    info!("Call-next request from staff {}", caller.id);

    let appointment = state.queue.call_next(&actor, params.into_target()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn pause_queue(
    State(state): State<QueueState>,
    Extension(caller): Extension<Caller>,
    Json(params): Json<QueueParams>,
) -> Result<Json<Value>, AppError> {
    let actor = staff_actor(&state, &caller).await?;
    let toggle = state.queue.pause(&actor, params.into_target()).await?;

    Ok(Json(json!({
        "success": true,
        "paused": toggle.updated_count,
        "queue": toggle
    })))
}

pub async fn resume_queue(
    State(state): State<QueueState>,
    Extension(caller): Extension<Caller>,
    Json(params): Json<QueueParams>,
) -> Result<Json<Value>, AppError> {
    let actor = staff_actor(&state, &caller).await?;
    let toggle = state.queue.resume(&actor, params.into_target()).await?;

    Ok(Json(json!({
        "success": true,
        "resumed": toggle.updated_count,
        "queue": toggle
    })))
}

pub async fn list_staff_appointments(
    State(state): State<QueueState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<StaffAppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let actor = staff_actor(&state, &caller).await?;
    let appointments = state.queue.staff_appointments(&actor, &query).await?;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments
    })))
}

pub async fn get_dashboard(
    State(state): State<QueueState>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<QueueParams>,
) -> Result<Json<Value>, AppError> {
    let actor = staff_actor(&state, &caller).await?;
    let target = params.into_target();

    let dashboard = state
        .queue
        .dashboard(&actor, target.department_id, target.date)
        .await?;

    Ok(Json(json!(dashboard)))
}

/// Server-sent stream of queue events for live dashboards.
pub async fn stream_events(
    State(state): State<QueueState>,
    Extension(caller): Extension<Caller>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let actor = staff_actor(&state, &caller).await?;
    info!("Staff {} subscribed to queue events", caller.id);

    let receiver = state.events.subscribe();
    let stream = stream::unfold((receiver, actor), |(mut receiver, actor)| async move {
        loop {
            match receiver.recv().await {
                Ok(event) if event.visible_to(&actor) => {
                    let item = Event::default().event(event.name()).json_data(&event);
                    return Some((item, (receiver, actor)));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
