use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::{DoctorDirectory, DoctorService, DurationTier, SupabaseDoctorDirectory};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

async fn directory(server: &MockServer) -> SupabaseDoctorDirectory {
    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    SupabaseDoctorDirectory::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn loads_doctor_with_pricing() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .and(header("apikey", "test-service-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockSupabaseResponses::doctor_response(&doctor_id.to_string())])),
        )
        .mount(&server)
        .await;

    let doctor = directory(&server).await.get_doctor(doctor_id).await.unwrap().unwrap();

    assert_eq!(doctor.id, doctor_id);
    assert_eq!(doctor.clinic_fee, Some(dec!(500)));
    assert_eq!(doctor.online_prices.unwrap().price(DurationTier::Min30), dec!(350));
}

#[tokio::test]
async fn loads_active_subscription_with_embedded_plan() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_subscriptions"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::subscription_response(&doctor_id.to_string())
        ])))
        .mount(&server)
        .await;

    let service = DoctorService::new(Arc::new(directory(&server).await));
    let subscription = service.active_subscription(doctor_id, Utc::now()).await.unwrap();

    assert_eq!(subscription.plan.name, "standard");
    assert_eq!(subscription.plan.clinic.platform_fee.figure, dec!(50));
}

#[tokio::test]
async fn deactivate_due_returns_changed_ids() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": doctor_id }])))
        .expect(1)
        .mount(&server)
        .await;

    let changed = directory(&server).await.deactivate_due(Utc::now()).await.unwrap();
    assert_eq!(changed, vec![doctor_id]);
}

#[tokio::test]
async fn storage_failure_surfaces_as_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockSupabaseResponses::error_response("boom", "XX000")),
        )
        .mount(&server)
        .await;

    let service = DoctorService::new(Arc::new(directory(&server).await));
    let err = service.get_doctor(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.action(), "storage-error");
}
