mod support;

use std::time::Duration;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::{AppointmentError, AppointmentSearchQuery};
use booking_queue_cell::{BookingQueueError, QueueEvent, QueueTarget};
use shared_database::ClinicStore;
use shared_models::appointment::{AppointmentStatus, QueueStatus};
use shared_models::auth::{Actor, StaffScope};
use shared_utils::test_utils::ClinicFixture;

use support::Harness;

fn target(h: &Harness) -> QueueTarget {
    QueueTarget {
        department_id: Some(h.fixture.department.id),
        doctor_id: Some(h.fixture.doctor.id),
        date: h.date(),
    }
}

#[tokio::test]
async fn serve_then_complete() {
    let h = Harness::new(3, 30).await;
    let staff = h.fixture.staff_actor(Some(h.fixture.department.id));
    let booked = h.state.admission.admit(&staff, h.walk_in("09:00", 1)).await.unwrap();
    let mut receiver = h.subscribe();

    let serving = h.state.lifecycle.start_serving(&staff, booked.id).await.unwrap();
    assert_eq!(serving.status, AppointmentStatus::Serving);
    let entry = h.fixture.store.queue_entry(booked.id).await.unwrap().unwrap();
    assert_eq!(entry.status, QueueStatus::Called);
    assert_matches!(receiver.try_recv(), Ok(QueueEvent::AppointmentUpdated(a)) if a.status == AppointmentStatus::Serving);
    assert_matches!(receiver.try_recv(), Ok(QueueEvent::QueueUpdate(c)) if c.department_id == booked.department_id);

    let done = h.state.lifecycle.complete(&staff, booked.id).await.unwrap();
    assert_eq!(done.status, AppointmentStatus::Completed);

    assert_matches!(
        h.state.lifecycle.complete(&staff, booked.id).await,
        Err(AppointmentError::InvalidTransition { from: AppointmentStatus::Completed, .. })
    );
}

#[tokio::test]
async fn complete_requires_serving() {
    let h = Harness::new(3, 30).await;
    let staff = h.fixture.staff_actor(None);
    let booked = h.state.admission.admit(&staff, h.walk_in("09:00", 1)).await.unwrap();

    assert_matches!(
        h.state.lifecycle.complete(&staff, booked.id).await,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Booked,
            to: AppointmentStatus::Completed
        })
    );
}

#[tokio::test]
async fn double_cancel_is_rejected() {
    let h = Harness::new(3, 30).await;
    let patient = h.fixture.add_patient("gina@example.com").await;
    let actor = ClinicFixture::patient_actor(&patient);
    let booked = h.state.admission.admit(&actor, h.request("09:00")).await.unwrap();

    let cancelled = h.state.lifecycle.cancel(&actor, booked.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    assert_matches!(
        h.state.lifecycle.cancel(&actor, booked.id).await,
        Err(AppointmentError::InvalidTransition { from: AppointmentStatus::Cancelled, .. })
    );
    assert_matches!(
        h.state.lifecycle.cancel(&h.fixture.staff_actor(None), booked.id).await,
        Err(AppointmentError::InvalidTransition { .. })
    );
}

#[tokio::test]
async fn patients_cancel_only_their_own_booked_appointments() {
    let h = Harness::new(3, 30).await;
    let owner = h.fixture.add_patient("owner@example.com").await;
    let stranger = h.fixture.add_patient("stranger@example.com").await;
    let staff = h.fixture.staff_actor(None);
    let booked = h
        .state
        .admission
        .admit(&ClinicFixture::patient_actor(&owner), h.request("09:00"))
        .await
        .unwrap();

    assert_matches!(
        h.state.lifecycle.cancel(&ClinicFixture::patient_actor(&stranger), booked.id).await,
        Err(AppointmentError::AccessDenied(_))
    );

    h.state.lifecycle.start_serving(&staff, booked.id).await.unwrap();
    assert_matches!(
        h.state.lifecycle.cancel(&ClinicFixture::patient_actor(&owner), booked.id).await,
        Err(AppointmentError::InvalidTransition { from: AppointmentStatus::Serving, .. })
    );

    // Staff may still cancel while serving
    let cancelled = h.state.lifecycle.cancel(&staff, booked.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn no_show_is_staff_only_and_announced() {
    let h = Harness::new(3, 30).await;
    let patient = h.fixture.add_patient("hank@example.com").await;
    let actor = ClinicFixture::patient_actor(&patient);
    let booked = h.state.admission.admit(&actor, h.request("09:00")).await.unwrap();

    assert_matches!(
        h.state.lifecycle.mark_no_show(&actor, booked.id).await,
        Err(AppointmentError::AccessDenied(_))
    );

    let mut receiver = h.subscribe();
    let missed = h
        .state
        .lifecycle
        .mark_no_show(&h.fixture.staff_actor(None), booked.id)
        .await
        .unwrap();

    assert_eq!(missed.status, AppointmentStatus::NoShow);
    assert_matches!(receiver.try_recv(), Ok(QueueEvent::AppointmentNoShow(a)) if a.id == booked.id);
    assert_matches!(receiver.try_recv(), Ok(QueueEvent::QueueUpdate(_)));
}

#[tokio::test]
async fn department_fixed_staff_cannot_touch_other_departments() {
    let h = Harness::new(3, 30).await;
    let dental = h.fixture.add_department("Dental", 3, 30).await;
    let admin = ClinicFixture::admin_actor();
    let booked = h.state.admission.admit(&admin, h.walk_in("09:00", 1)).await.unwrap();

    let fixed_elsewhere = h.fixture.staff_actor(Some(dental.id));
    assert_matches!(
        h.state.lifecycle.start_serving(&fixed_elsewhere, booked.id).await,
        Err(AppointmentError::AccessDenied(_))
    );

    let other_org = Actor::Staff {
        user_id: Uuid::new_v4(),
        scope: StaffScope { organization_id: Uuid::new_v4(), department_id: None },
    };
    assert_matches!(
        h.state.lifecycle.cancel(&other_org, booked.id).await,
        Err(AppointmentError::AccessDenied(_))
    );

    let org_wide = h.fixture.staff_actor(None);
    assert!(h.state.lifecycle.start_serving(&org_wide, booked.id).await.is_ok());
}

#[tokio::test]
async fn racing_staff_cannot_both_start_serving() {
    let h = Harness::new(3, 30).await;
    let staff = h.fixture.staff_actor(None);
    let booked = h.state.admission.admit(&staff, h.walk_in("09:00", 1)).await.unwrap();

    let (first, second) = tokio::join!(
        h.state.lifecycle.start_serving(&staff, booked.id),
        h.state.lifecycle.start_serving(&staff, booked.id)
    );

    let wins = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn booked_is_not_a_target_status() {
    let h = Harness::new(3, 30).await;
    let staff = h.fixture.staff_actor(None);
    let booked = h.state.admission.admit(&staff, h.walk_in("09:00", 1)).await.unwrap();

    assert_matches!(
        h.state.lifecycle.update_status(&staff, booked.id, AppointmentStatus::Booked).await,
        Err(AppointmentError::InvalidTransition { to: AppointmentStatus::Booked, .. })
    );
    assert_matches!(
        h.state.lifecycle.update_status(&staff, Uuid::new_v4(), AppointmentStatus::Serving).await,
        Err(AppointmentError::NotFound(_))
    );
}

#[tokio::test]
async fn call_next_drains_in_list_queue_order_and_skips_cancelled() {
    let h = Harness::new(5, 30).await;
    let staff = h.fixture.staff_actor(Some(h.fixture.department.id));
    let admin = ClinicFixture::admin_actor();

    h.state.admission.admit(&staff, h.walk_in("09:00", 1)).await.unwrap();
    let dropped = h.state.admission.admit(&staff, h.walk_in("09:00", 2)).await.unwrap();
    h.state.admission.admit(&staff, h.walk_in("10:00", 3)).await.unwrap();
    let mut urgent = h.walk_in("09:00", 4);
    urgent.is_emergency = true;
    h.state.admission.admit(&admin, urgent).await.unwrap();

    h.state.lifecycle.cancel(&staff, dropped.id).await.unwrap();

    let listed: Vec<Uuid> = h
        .queue
        .list_queue(&staff, target(&h))
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.appointment.id)
        .collect();
    assert_eq!(listed.len(), 3);
    assert!(!listed.contains(&dropped.id));

    let mut drained = Vec::new();
    loop {
        match h.queue.call_next(&staff, target(&h)).await {
            Ok(appointment) => drained.push(appointment.id),
            Err(BookingQueueError::QueueEmpty) => break,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(drained, listed);
}

#[tokio::test]
async fn history_lists_newest_first() {
    let h = Harness::new(5, 30).await;
    let patient = h.fixture.add_patient("ivy@example.com").await;
    let actor = ClinicFixture::patient_actor(&patient);
    let dental = h.fixture.add_department("Dental", 3, 30).await;

    let first = h.state.admission.admit(&actor, h.request("09:00")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let mut second_request = h.request("09:00");
    second_request.department_id = dental.id;
    second_request.doctor_id = None;
    let second = h.state.admission.admit(&actor, second_request).await.unwrap();

    let mine = h.state.history.my_appointments(&actor).await.unwrap();
    let ids: Vec<Uuid> = mine.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    assert_matches!(
        h.state.history.all_appointments(&actor, &AppointmentSearchQuery::default()).await,
        Err(AppointmentError::AccessDenied(_))
    );
    let everything = h
        .state
        .history
        .all_appointments(&ClinicFixture::admin_actor(), &AppointmentSearchQuery::default())
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);
}
