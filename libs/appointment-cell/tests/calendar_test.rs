mod support;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use appointment_cell::AppointmentError;

use support::Harness;

#[tokio::test]
async fn slots_report_remaining_capacity() {
    let h = Harness::new(2, 60).await;
    let staff = h.fixture.staff_actor(None);
    h.state.admission.admit(&staff, h.walk_in("10:00", 1)).await.unwrap();

    let slots = h
        .state
        .calendar
        .list_slots(h.fixture.department.id, h.date(), Some(h.fixture.doctor.id))
        .await
        .unwrap();

    assert_eq!(slots.len(), 8);
    let ten = slots.iter().find(|s| s.time_slot == "10:00").unwrap();
    assert_eq!(ten.remaining, 1);
    assert!(ten.available);
    assert!(slots.iter().filter(|s| s.time_slot != "10:00").all(|s| s.remaining == 2));
}

#[tokio::test]
async fn cancellation_returns_capacity() {
    let h = Harness::new(1, 60).await;
    let staff = h.fixture.staff_actor(None);
    let booked = h.state.admission.admit(&staff, h.walk_in("09:00", 1)).await.unwrap();

    let before = h
        .state
        .calendar
        .list_slots(h.fixture.department.id, h.date(), None)
        .await
        .unwrap();
    assert!(!before[0].available);

    h.state.lifecycle.cancel(&staff, booked.id).await.unwrap();

    let after = h
        .state
        .calendar
        .list_slots(h.fixture.department.id, h.date(), None)
        .await
        .unwrap();
    assert_eq!(after[0].remaining, 1);
}

#[tokio::test]
async fn emergencies_do_not_consume_slot_capacity() {
    let h = Harness::new(1, 60).await;
    let admin = shared_utils::test_utils::ClinicFixture::admin_actor();
    let mut urgent = h.walk_in("09:00", 1);
    urgent.is_emergency = true;
    h.state.admission.admit(&admin, urgent).await.unwrap();

    let slots = h
        .state
        .calendar
        .list_slots(h.fixture.department.id, h.date(), None)
        .await
        .unwrap();
    assert!(slots.iter().all(|s| s.available));
}

#[tokio::test]
async fn fully_booked_day_is_not_offered() {
    let h = Harness::new(1, 240).await;
    let staff = h.fixture.staff_actor(None);
    h.state.admission.admit(&staff, h.walk_in("09:00", 1)).await.unwrap();
    h.state.admission.admit(&staff, h.walk_in("13:00", 2)).await.unwrap();

    let dates = h
        .state
        .calendar
        .available_dates(h.fixture.department.id, h.date(), 3, Some(h.fixture.doctor.id))
        .await
        .unwrap();

    assert_eq!(
        dates,
        vec![h.date() + Duration::days(1), h.date() + Duration::days(2)]
    );
}

#[tokio::test]
async fn unknown_department_or_organization_is_not_found() {
    let h = Harness::new(1, 30).await;

    assert_matches!(
        h.state.calendar.list_slots(Uuid::new_v4(), h.date(), None).await,
        Err(AppointmentError::NotFound(_))
    );
    assert_matches!(
        h.state.calendar.departments(Uuid::new_v4()).await,
        Err(AppointmentError::NotFound(_))
    );

    let departments = h.state.calendar.departments(h.fixture.organization.id).await.unwrap();
    assert_eq!(departments.len(), 1);
    let doctors = h.state.calendar.doctors(h.fixture.department.id).await.unwrap();
    assert_eq!(doctors[0].id, h.fixture.doctor.id);
}

#[tokio::test]
async fn slot_longer_than_the_workday_offers_nothing() {
    let h = Harness::new(2, u32::MAX).await;

    let slots = h
        .state
        .calendar
        .list_slots(h.fixture.department.id, h.date(), None)
        .await
        .unwrap();
    assert!(slots.is_empty());

    let dates = h
        .state
        .calendar
        .available_dates(h.fixture.department.id, h.date(), 7, None)
        .await
        .unwrap();
    assert!(dates.is_empty());
}

#[tokio::test]
async fn lookahead_stops_at_the_last_calendar_day() {
    let h = Harness::new(2, 60).await;

    let dates = h
        .state
        .calendar
        .available_dates(h.fixture.department.id, NaiveDate::MAX, 30, None)
        .await
        .unwrap();
    assert_eq!(dates, vec![NaiveDate::MAX]);
}
