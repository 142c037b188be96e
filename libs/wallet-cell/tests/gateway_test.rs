use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{basic_auth, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use wallet_cell::handlers::WalletState;
use wallet_cell::router::wallet_routes;
use wallet_cell::services::gateway::sign;
use wallet_cell::{LedgerError, LedgerService, MemoryWalletStore, PaymentGatewayClient};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        payment_gateway_base_url: format!("{}/v1", server.uri()),
        ..TestConfig::default().to_app_config()
    }
}

fn order(id: &str, user_id: Uuid, minor_amount: i64) -> Value {
    json!({
        "id": id,
        "amount": minor_amount,
        "currency": "INR",
        "status": "paid",
        "receipt": "wallet_test",
        "notes": { "user_id": user_id.to_string() }
    })
}

#[tokio::test]
async fn gateway_requires_credentials() {
    let config = AppConfig {
        payment_gateway_key_secret: String::new(),
        ..TestConfig::default().to_app_config()
    };

    assert!(matches!(
        PaymentGatewayClient::new(&config),
        Err(LedgerError::GatewayNotConfigured)
    ));
}

#[tokio::test]
async fn create_order_sends_minor_units_with_basic_auth() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .and(basic_auth("rzp_test_key", "gateway-secret"))
        .and(body_partial_json(json!({ "amount": 50050, "currency": "INR" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(order("order_1", user_id, 50050)))
        .expect(1)
        .mount(&server)
        .await;

    let client = PaymentGatewayClient::new(&config_for(&server)).unwrap();
    let created = client.create_order(user_id, dec!(500.50)).await.unwrap();

    assert_eq!(created.id, "order_1");
    assert_eq!(created.major_amount(), dec!(500.50));
    assert_eq!(created.owner(), Some(user_id));
}

#[tokio::test]
async fn gateway_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/orders/order_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not found" })))
        .mount(&server)
        .await;

    let client = PaymentGatewayClient::new(&config_for(&server)).unwrap();
    let err = client.fetch_order("order_missing").await.unwrap_err();

    assert_eq!(err.action(), "payment-gateway-error");
}

#[tokio::test]
async fn verified_top_up_credits_the_wallet_once() {
    let server = MockServer::start().await;
    let config = Arc::new(config_for(&server));
    let user = TestUser::patient("patient@example.com");
    let user_id = Uuid::parse_str(&user.id).unwrap();
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, None);

    Mock::given(method("GET"))
        .and(path("/v1/orders/order_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order("order_9", user_id, 75000)))
        .mount(&server)
        .await;

    let state = Arc::new(WalletState {
        config: config.clone(),
        ledger: Arc::new(LedgerService::new(Arc::new(MemoryWalletStore::new()))),
        gateway: Some(Arc::new(PaymentGatewayClient::new(&config).unwrap())),
    });
    let app = wallet_routes(state);

    let verify = |signature: String| {
        Request::builder()
            .method("POST")
            .uri("/orders/verify")
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .body(Body::from(
                json!({ "order_id": "order_9", "payment_id": "pay_9", "signature": signature }).to_string(),
            ))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(verify("deadbeef".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let signature = sign("gateway-secret", "order_9", "pay_9").unwrap();
    let response = app.clone().oneshot(verify(signature.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["wallet"]["balance"], "750.00");

    let response = app.oneshot(verify(signature)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["action"], "payment-already-credited");
}

#[tokio::test]
async fn wallet_endpoint_opens_an_empty_wallet() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, None);

    let app = wallet_routes(Arc::new(WalletState {
        config: config.clone(),
        ledger: Arc::new(LedgerService::new(Arc::new(MemoryWalletStore::new()))),
        gateway: None,
    }));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["wallet"]["user_id"], user.id);
    assert_eq!(body["wallet"]["available_credit"], "0");
}
