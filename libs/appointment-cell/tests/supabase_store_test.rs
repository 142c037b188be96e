use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    ModalityDetails, PaymentDetails, Reservation, ReservationStatus, ReservationStore, Slot,
    SupabaseReservationStore, TimeRange,
};
use doctor_cell::DurationTier;
use shared_database::SupabaseClient;
use shared_utils::test_utils::TestConfig;

fn store(server: &MockServer) -> SupabaseReservationStore {
    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    SupabaseReservationStore::new(Arc::new(SupabaseClient::new(&config)))
}

fn clinic_reservation() -> Reservation {
    let start = Utc::now() + Duration::days(1);
    Reservation::new(
        Uuid::new_v4(),
        Some(Uuid::new_v4()),
        Some(Slot {
            day: start.date_naive(),
            duration: DurationTier::Min30,
            time: TimeRange { start, end: start + Duration::minutes(30) },
        }),
        ModalityDetails::Clinic {},
        PaymentDetails::frozen(dec!(500)),
        Utc::now(),
    )
}

#[tokio::test]
async fn reads_reservation_rows() {
    let server = MockServer::start().await;
    let reservation = clinic_reservation();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("id", format!("eq.{}", reservation.id)))
        .and(header("apikey", "test-service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([reservation])))
        .mount(&server)
        .await;

    let loaded = store(&server).get(reservation.id).await.unwrap().unwrap();

    assert_eq!(loaded, reservation);
    assert_eq!(loaded.payment.amount_frozen, dec!(500));
}

#[tokio::test]
async fn compare_and_swap_is_filtered_by_version() {
    let server = MockServer::start().await;
    let mut next = clinic_reservation();
    next.status = ReservationStatus::Accepted;
    next.version = 4;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("id", format!("eq.{}", next.id)))
        .and(query_param("version", "eq.3"))
        .and(body_partial_json(json!({ "status": "accepted", "version": 4 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([next])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("version", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(store.compare_and_swap(3, &next).await.unwrap());
    assert!(!store.compare_and_swap(2, &next).await.unwrap());
}

#[tokio::test]
async fn exclusion_conflict_on_insert_means_slot_taken() {
    let server = MockServer::start().await;
    let reservation = clinic_reservation();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint"
        })))
        .mount(&server)
        .await;

    let inserted = store(&server)
        .insert_if_slot_free(&reservation, &[ReservationStatus::Pending, ReservationStatus::Accepted])
        .await
        .unwrap();

    assert!(!inserted);
}

#[tokio::test]
async fn overlapping_row_short_circuits_the_insert() {
    let server = MockServer::start().await;
    let existing = clinic_reservation();
    let mut requested = clinic_reservation();
    requested.doctor_id = existing.doctor_id;
    requested.slot = existing.slot;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("doctor_id", format!("eq.{}", existing.doctor_id.unwrap())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([existing])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([requested])))
        .expect(0)
        .mount(&server)
        .await;

    let inserted = store(&server)
        .insert_if_slot_free(&requested, &[ReservationStatus::Pending, ReservationStatus::Accepted])
        .await
        .unwrap();

    assert!(!inserted);
}
