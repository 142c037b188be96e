// libs/video-conferencing-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Room resource as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRoom {
    pub sid: String,
    pub unique_name: String,
    pub status: String,
    #[serde(rename = "type", default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub max_participants: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoGrant {
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Grants {
    pub identity: String,
    pub video: VideoGrant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    pub jti: String,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub grants: Grants,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoRoomError {
    #[error("Video rooms not configured")]
    NotConfigured,

    #[error("Video provider error: {message}")]
    Api { message: String },

    #[error("Failed to issue access token: {0}")]
    Token(String),
}

impl VideoRoomError {
    pub fn action(&self) -> &'static str {
        "video-room-error"
    }
}

impl From<reqwest::Error> for VideoRoomError {
    fn from(err: reqwest::Error) -> Self {
        VideoRoomError::Api {
            message: err.to_string(),
        }
    }
}
