use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

/// Validates an HS256 bearer token and returns the principal it names.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let (header_b64, claims_b64, signature_b64) = (parts[0], parts[1], parts[2]);

    let header: JwtHeader = decode_segment(header_b64)
        .map_err(|_| "Invalid token header".to_string())?;
    if header.alg != "HS256" {
        debug!("Rejected token signed with {}", header.alg);
        return Err("Unsupported token algorithm".to_string());
    }

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        "Invalid signature encoding".to_string()
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims: JwtClaims = decode_segment(claims_b64).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, String> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn accepts_valid_token() {
        let user = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, Some(1));

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role.as_deref(), Some("doctor"));
    }

    #[test]
    fn rejects_expired_and_forged_tokens() {
        let user = TestUser::default();

        let expired = JwtTestUtils::create_expired_token(&user, SECRET);
        assert_eq!(validate_token(&expired, SECRET).unwrap_err(), "Token expired");

        let forged = JwtTestUtils::create_invalid_signature_token(&user);
        assert_eq!(validate_token(&forged, SECRET).unwrap_err(), "Invalid token signature");

        let malformed = JwtTestUtils::create_malformed_token();
        assert!(validate_token(&malformed, SECRET).is_err());
    }

    #[test]
    fn rejects_when_secret_missing() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, SECRET, None);
        assert_eq!(validate_token(&token, "").unwrap_err(), "JWT secret is not set");
    }
}
