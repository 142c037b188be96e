// libs/video-conferencing-cell/src/services/tokens.rs
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::models::{AccessTokenClaims, Grants, VideoGrant, VideoRoomError};

const TOKEN_CONTENT_TYPE: &str = "twilio-fpa;v=1";

/// Mints an HS256 access token granting `identity` entry to `room_name`.
pub fn issue_access_token(
    key_sid: &str,
    key_secret: &str,
    identity: &str,
    room_name: &str,
    ttl: Duration,
) -> Result<String, VideoRoomError> {
    let now = Utc::now();
    let claims = AccessTokenClaims {
        jti: format!("{}-{}", key_sid, Uuid::new_v4().simple()),
        iss: key_sid.to_string(),
        sub: key_sid.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        grants: Grants {
            identity: identity.to_string(),
            video: VideoGrant {
                room: room_name.to_string(),
            },
        },
    };

    let mut header = Header::new(Algorithm::HS256);
    header.cty = Some(TOKEN_CONTENT_TYPE.to_string());

    encode(&header, &claims, &EncodingKey::from_secret(key_secret.as_bytes()))
        .map_err(|e| VideoRoomError::Token(e.to_string()))
}

pub fn decode_access_token(key_secret: &str, token: &str) -> Result<AccessTokenClaims, VideoRoomError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<AccessTokenClaims>(token, &DecodingKey::from_secret(key_secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| VideoRoomError::Token(e.to_string()))
}
