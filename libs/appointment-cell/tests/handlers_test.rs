mod support;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::{
    create_admin_appointment_router, create_appointment_router, create_staff_appointment_router,
};
use shared_models::auth::Role;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

use support::Harness;

fn bearer(user: &TestUser) -> String {
    let token = JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, Some(1));
    format!("Bearer {}", token)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, json)
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn catalogue_is_public() {
    let h = Harness::new(2, 30).await;
    let app = create_appointment_router(h.state.clone());

    let (status, json) = send(
        app.clone(),
        Request::builder().uri("/organizations").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["organizations"][0]["name"], "City Clinic");
    assert_eq!(json["organizations"][0]["type"], "CLINIC");

    let uri = format!("/departments/{}/slots?date=2030-03-14", h.fixture.department.id);
    let (status, json) = send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slots"].as_array().unwrap().len(), 16);
    assert_eq!(json["slots"][0]["time_slot"], "09:00");
}

#[tokio::test]
async fn booking_requires_a_token() {
    let h = Harness::new(2, 30).await;
    let app = create_appointment_router(h.state.clone());
    let body = serde_json::to_value(h.request("09:00")).unwrap();

    let (status, json) = send(app, json_request("POST", "/", None, body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["kind"], "Unauthorized");
}

#[tokio::test]
async fn patient_books_and_cancels_over_http() {
    let h = Harness::new(2, 30).await;
    let app = create_appointment_router(h.state.clone());
    let patient = TestUser::patient("jo@example.com");
    let auth = bearer(&patient);
    let body = serde_json::to_value(h.request("11:00")).unwrap();

    let (status, json) = send(app.clone(), json_request("POST", "/", Some(&auth), body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["token_number"], 1);
    assert_eq!(json["appointment"]["patient"]["user_id"], patient.id.to_string());
    let id = json["appointment"]["id"].as_str().unwrap().to_string();

    let cancel = format!("/{}/cancel", id);
    let (status, _) = send(app.clone(), json_request("POST", &cancel, Some(&auth), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(app.clone(), json_request("POST", &cancel, Some(&auth), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "InvalidTransition");

    let mine = Request::builder()
        .uri("/mine")
        .header("authorization", &auth)
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, mine).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["appointments"][0]["status"], "CANCELLED");
}

#[tokio::test]
async fn full_slot_is_a_conflict() {
    let h = Harness::new(1, 30).await;
    let app = create_appointment_router(h.state.clone());

    let first = bearer(&TestUser::patient("a@example.com"));
    let second = bearer(&TestUser::patient("b@example.com"));
    let body = serde_json::to_value(h.request("09:00")).unwrap();

    let (status, _) = send(app.clone(), json_request("POST", "/", Some(&first), body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(app, json_request("POST", "/", Some(&second), body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "SlotFull");
}

#[tokio::test]
async fn status_updates_are_staff_only() {
    let h = Harness::new(2, 30).await;
    let booked = h
        .state
        .admission
        .admit(&h.fixture.staff_actor(None), h.walk_in("09:00", 1))
        .await
        .unwrap();
    let app = create_staff_appointment_router(h.state.clone());
    let uri = format!("/appointments/{}/status", booked.id);

    let patient = bearer(&TestUser::patient("p@example.com"));
    let (status, json) = send(
        app.clone(),
        json_request("PATCH", &uri, Some(&patient), json!({ "status": "SERVING" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["kind"], "AccessDenied");

    let (staff_user, _) = h.fixture.add_staff(None).await;
    let staff = bearer(&TestUser::with_id(staff_user.id, &staff_user.email, Role::Staff));
    let (status, json) = send(
        app,
        json_request("PATCH", &uri, Some(&staff), json!({ "status": "SERVING" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["appointment"]["status"], "SERVING");
}

#[tokio::test]
async fn admin_emergency_booking_bypasses_capacity() {
    let h = Harness::new(1, 30).await;
    h.state
        .admission
        .admit(&h.fixture.staff_actor(None), h.walk_in("09:00", 1))
        .await
        .unwrap();
    let app = create_admin_appointment_router(h.state.clone());
    let admin = bearer(&TestUser::admin("root@example.com"));
    let body = serde_json::to_value(h.walk_in("09:00", 2)).unwrap();

    let (status, json) = send(
        app.clone(),
        json_request("POST", "/appointments/emergency", Some(&admin), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["appointment"]["time_slot"], "EMERGENCY");
    assert_eq!(json["token_number"], 2);

    let staff = bearer(&TestUser::staff("desk@example.com"));
    let (status, _) = send(
        app,
        json_request("POST", "/appointments/emergency", Some(&staff), body),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
