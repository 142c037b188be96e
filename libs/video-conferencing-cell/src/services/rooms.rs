// libs/video-conferencing-cell/src/services/rooms.rs
use async_trait::async_trait;
use chrono::Duration;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{VideoRoom, VideoRoomError};
use crate::services::tokens::issue_access_token;

const TOKEN_TTL_HOURS: i64 = 4;

/// Room name stored on the reservation. Stable per reservation so a retried
/// provisioning call lands in the same room.
pub fn room_name_for(reservation_id: Uuid) -> String {
    format!("consult-{}", reservation_id.simple())
}

#[async_trait]
pub trait VideoRoomProvider: Send + Sync {
    /// Ensures a room exists for the reservation and returns its name.
    async fn provision_room(&self, reservation_id: Uuid) -> Result<String, VideoRoomError>;

    fn access_token(&self, identity: &str, room_name: &str) -> Result<String, VideoRoomError>;
}

/// REST client for the hosted room provider.
#[derive(Debug)]
pub struct VideoRoomClient {
    client: Client,
    base_url: String,
    key_sid: String,
    key_secret: String,
}

impl VideoRoomClient {
    pub fn new(config: &AppConfig) -> Result<Self, VideoRoomError> {
        if !config.is_video_configured() {
            return Err(VideoRoomError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.video_api_base_url.trim_end_matches('/').to_string(),
            key_sid: config.video_api_key_sid.clone(),
            key_secret: config.video_api_key_secret.clone(),
        })
    }

    /// POST /Rooms
    pub async fn create_room(&self, unique_name: &str) -> Result<VideoRoom, VideoRoomError> {
        info!("Creating video room {}", unique_name);

        let url = format!("{}/Rooms", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_sid, Some(&self.key_secret))
            .form(&[
                ("UniqueName", unique_name),
                ("Type", "group"),
                ("MaxParticipants", "2"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| VideoRoomError::Api {
                message: format!("Failed to parse room response: {}", e),
            });
        }

        // A name collision means an earlier attempt already created the room.
        if status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT {
            if let Some(existing) = self.fetch_room(unique_name).await? {
                debug!("Reusing existing video room {}", existing.unique_name);
                return Ok(existing);
            }
        }

        error!("Video room creation failed: {} - {}", status, body);
        Err(VideoRoomError::Api {
            message: format!("HTTP {}: {}", status, body),
        })
    }

    /// GET /Rooms/{unique_name}
    pub async fn fetch_room(&self, unique_name: &str) -> Result<Option<VideoRoom>, VideoRoomError> {
        let url = format!("{}/Rooms/{}", self.base_url, unique_name);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.key_sid, Some(&self.key_secret))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let room = response.json::<VideoRoom>().await?;
                Ok(Some(room))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!("Video room lookup failed: {} - {}", status, body);
                Err(VideoRoomError::Api {
                    message: format!("HTTP {}: {}", status, body),
                })
            }
        }
    }
}

#[async_trait]
impl VideoRoomProvider for VideoRoomClient {
    async fn provision_room(&self, reservation_id: Uuid) -> Result<String, VideoRoomError> {
        let room = self.create_room(&room_name_for(reservation_id)).await?;
        Ok(room.unique_name)
    }

    fn access_token(&self, identity: &str, room_name: &str) -> Result<String, VideoRoomError> {
        issue_access_token(
            &self.key_sid,
            &self.key_secret,
            identity,
            room_name,
            Duration::hours(TOKEN_TTL_HOURS),
        )
    }
}

/// Provider used when no video credentials are configured: names rooms
/// locally and signs tokens with the given secret.
pub struct UnmanagedRooms {
    signing_secret: String,
}

impl UnmanagedRooms {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }
}

#[async_trait]
impl VideoRoomProvider for UnmanagedRooms {
    async fn provision_room(&self, reservation_id: Uuid) -> Result<String, VideoRoomError> {
        let name = room_name_for(reservation_id);
        debug!("Assigning unmanaged video room {}", name);
        Ok(name)
    }

    fn access_token(&self, identity: &str, room_name: &str) -> Result<String, VideoRoomError> {
        issue_access_token(
            "local",
            &self.signing_secret,
            identity,
            room_name,
            Duration::hours(TOKEN_TTL_HOURS),
        )
    }
}
