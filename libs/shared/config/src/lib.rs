use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub supabase_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub video_api_base_url: String,
    pub video_api_key_sid: String,
    pub video_api_key_secret: String,
    pub payment_gateway_base_url: String,
    pub payment_gateway_key_id: String,
    pub payment_gateway_key_secret: String,
    pub notification_webhook_url: Option<String>,
    pub sweeper_interval_seconds: u64,
    pub clinic_otp_expiry_hours: Option<i64>,
    pub home_visit_otp_expiry_hours: Option<i64>,
    pub emergency_response_window_minutes: i64,
    pub emergency_finalize_window_minutes: i64,
    pub online_accepted_expiry_policy: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            storage_backend: env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|value| match value.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, falling back to supabase", e);
                        None
                    }
                })
                .unwrap_or(StorageBackend::Supabase),
            video_api_base_url: env::var("VIDEO_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_API_BASE_URL not set, using default");
                    "https://video.twilio.com/v1".to_string()
                }),
            video_api_key_sid: env::var("VIDEO_API_KEY_SID")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_API_KEY_SID not set, using empty value");
                    String::new()
                }),
            video_api_key_secret: env::var("VIDEO_API_KEY_SECRET")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_API_KEY_SECRET not set, using empty value");
                    String::new()
                }),
            payment_gateway_base_url: env::var("PAYMENT_GATEWAY_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_GATEWAY_BASE_URL not set, using default");
                    "https://api.razorpay.com/v1".to_string()
                }),
            payment_gateway_key_id: env::var("PAYMENT_GATEWAY_KEY_ID")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_GATEWAY_KEY_ID not set, using empty value");
                    String::new()
                }),
            payment_gateway_key_secret: env::var("PAYMENT_GATEWAY_KEY_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_GATEWAY_KEY_SECRET not set, using empty value");
                    String::new()
                }),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL").ok(),
            sweeper_interval_seconds: parse_var("SWEEPER_INTERVAL_SECONDS", 300),
            clinic_otp_expiry_hours: optional_hours("CLINIC_OTP_EXPIRY_HOURS", 24),
            home_visit_otp_expiry_hours: optional_hours("HOME_VISIT_OTP_EXPIRY_HOURS", 24),
            emergency_response_window_minutes: parse_var("EMERGENCY_RESPONSE_WINDOW_MINUTES", 30),
            emergency_finalize_window_minutes: parse_var("EMERGENCY_FINALIZE_WINDOW_MINUTES", 240),
            online_accepted_expiry_policy: env::var("ONLINE_ACCEPTED_EXPIRY_POLICY")
                .unwrap_or_else(|_| "unattended".to_string()),
            server_port: parse_var("SERVER_PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        match self.storage_backend {
            StorageBackend::Memory => !self.supabase_jwt_secret.is_empty(),
            StorageBackend::Supabase => {
                !self.supabase_url.is_empty()
                    && !self.supabase_service_key.is_empty()
                    && !self.supabase_jwt_secret.is_empty()
            }
        }
    }

    pub fn is_video_configured(&self) -> bool {
        !self.video_api_base_url.is_empty()
            && !self.video_api_key_sid.is_empty()
            && !self.video_api_key_secret.is_empty()
    }

    pub fn is_payment_gateway_configured(&self) -> bool {
        !self.payment_gateway_base_url.is_empty()
            && !self.payment_gateway_key_id.is_empty()
            && !self.payment_gateway_key_secret.is_empty()
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not valid, using default", name);
            default
        }),
        Err(_) => default,
    }
}

/// Reads an expiry in hours where `0` or `none` disables expiry.
fn optional_hours(name: &str, default: i64) -> Option<i64> {
    match env::var(name) {
        Ok(raw) if raw.eq_ignore_ascii_case("none") || raw == "0" => None,
        Ok(raw) => match raw.parse() {
            Ok(hours) => Some(hours),
            Err(_) => {
                warn!("{} is not valid, using default of {} hours", name, default);
                Some(default)
            }
        },
        Err(_) => Some(default),
    }
}
