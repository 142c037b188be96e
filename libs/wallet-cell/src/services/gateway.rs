// libs/wallet-cell/src/services/gateway.rs
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::LedgerError;
use crate::models::GatewayOrder;

type HmacSha256 = Hmac<Sha256>;

const CURRENCY: &str = "INR";

/// Client for the card/UPI payment gateway used to top up wallets.
pub struct PaymentGatewayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl PaymentGatewayClient {
    pub fn new(config: &AppConfig) -> Result<Self, LedgerError> {
        if !config.is_payment_gateway_configured() {
            return Err(LedgerError::GatewayNotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.payment_gateway_base_url.trim_end_matches('/').to_string(),
            key_id: config.payment_gateway_key_id.clone(),
            key_secret: config.payment_gateway_key_secret.clone(),
        })
    }

    /// POST /orders
    pub async fn create_order(&self, user_id: Uuid, amount: Decimal) -> Result<GatewayOrder, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let minor_units = (amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or(LedgerError::InvalidAmount(amount))?;

        info!("Creating gateway order of {} for user {}", amount, user_id);

        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": minor_units,
                "currency": CURRENCY,
                "receipt": format!("wallet_{}", Uuid::new_v4().simple()),
                "notes": { "user_id": user_id.to_string() },
            }))
            .send()
            .await
            .map_err(|e| LedgerError::Gateway(e.to_string()))?;

        Self::parse_order(response).await
    }

    /// GET /orders/{id}
    pub async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, LedgerError> {
        let url = format!("{}/orders/{}", self.base_url, order_id);
        debug!("Fetching gateway order {}", order_id);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| LedgerError::Gateway(e.to_string()))?;

        Self::parse_order(response).await
    }

    /// Checks the checkout signature: hex HMAC-SHA256 of `order_id|payment_id`.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(&self.key_secret, order_id, payment_id, signature)
    }

    async fn parse_order(response: reqwest::Response) -> Result<GatewayOrder, LedgerError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LedgerError::Gateway(e.to_string()))?;

        if !status.is_success() {
            error!("Payment gateway request failed: {} - {}", status, body);
            return Err(LedgerError::Gateway(format!("HTTP {}", status)));
        }

        serde_json::from_str(&body)
            .map_err(|e| LedgerError::Gateway(format!("Failed to parse order: {}", e)))
    }
}

pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Some(expected) = decode_hex(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Produces the checkout signature the gateway sends back for a payment.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> Result<String, LedgerError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| LedgerError::Gateway(format!("Invalid signing key: {}", e)))?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Ok(mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(input.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let signature = sign("secret", "order_1", "pay_1").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify_signature("secret", "order_1", "pay_1", &signature));
    }

    #[test]
    fn tampered_signature_rejected() {
        let signature = sign("secret", "order_1", "pay_1").unwrap();
        assert!(!verify_signature("secret", "order_1", "pay_2", &signature));
        assert!(!verify_signature("other", "order_1", "pay_1", &signature));
        assert!(!verify_signature("secret", "order_1", "pay_1", "zz"));
    }

    #[test]
    fn empty_key_never_yields_an_empty_signature() {
        let signature = sign("", "order_1", "pay_1").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify_signature("", "order_1", "pay_1", &signature));
    }
}
