use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub storage_backend: StorageBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            storage_backend: StorageBackend::Memory,
        }
    }
}

impl TestConfig {
    /// Points the Supabase client at a mock server.
    pub fn with_supabase(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            storage_backend: StorageBackend::Supabase,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            storage_backend: self.storage_backend,
            video_api_base_url: "http://localhost:9999/v1".to_string(),
            video_api_key_sid: "SK-test".to_string(),
            video_api_key_secret: "video-secret".to_string(),
            payment_gateway_base_url: "http://localhost:9998/v1".to_string(),
            payment_gateway_key_id: "rzp_test_key".to_string(),
            payment_gateway_key_secret: "gateway-secret".to_string(),
            notification_webhook_url: None,
            sweeper_interval_seconds: 0,
            clinic_otp_expiry_hours: Some(24),
            home_visit_otp_expiry_hours: Some(24),
            emergency_response_window_minutes: 30,
            emergency_finalize_window_minutes: 240,
            online_accepted_expiry_policy: "unattended".to_string(),
            server_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
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
            "sub": user.id,
            "email": user.email,
            "role": user.role,
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

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn wallet_response(user_id: &str, balance: f64, frozen: f64, version: i64) -> serde_json::Value {
        json!({
            "user_id": user_id,
            "balance": balance,
            "frozen": frozen,
            "version": version,
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_response(doctor_id: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "full_name": "Dr. Test Doctor",
            "online_prices": { "min15": 200, "min30": 350, "min60": 600 },
            "clinic_fee": 500,
            "home_visit_fixed_cost": 800,
            "emergency_fee": 1000,
            "is_active": true,
            "deactivate_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn fee_schedule(platform_flat: f64, ops_percentage: f64) -> serde_json::Value {
        json!({
            "platform_fee": { "type": "Number", "figure": platform_flat },
            "ops_expense": { "type": "Percentage", "figure": ops_percentage }
        })
    }

    pub fn subscription_response(doctor_id: &str) -> serde_json::Value {
        let schedule = Self::fee_schedule(50.0, 10.0);
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "start_date": "2024-01-01T00:00:00Z",
            "end_date": null,
            "plan": {
                "id": Uuid::new_v4(),
                "name": "standard",
                "online": { "min15": schedule, "min30": schedule, "min60": schedule },
                "clinic": schedule,
                "home_visit": schedule,
                "emergency": schedule
            }
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
