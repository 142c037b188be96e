// libs/video-conferencing-cell/src/lib.rs
//! # Video Conferencing Cell
//!
//! Provisions video rooms for online and emergency consultations and issues
//! short-lived access tokens for the two participants.
//!
//! Only the room name is persisted on a reservation. Tokens are minted on
//! demand from the API key pair, so nothing secret is stored.
//!
//! ## Configuration
//!
//! - `VIDEO_API_BASE_URL` - REST base of the room provider
//! - `VIDEO_API_KEY_SID` - API key identifier, also the token issuer
//! - `VIDEO_API_KEY_SECRET` - API key secret, used for basic auth and token signing
//!
//! When the key pair is missing, `UnmanagedRooms` hands out deterministic room
//! names without calling the provider.

pub mod models;
pub mod services;

pub use models::{AccessTokenClaims, VideoGrant, VideoRoom, VideoRoomError};
pub use services::{room_name_for, UnmanagedRooms, VideoRoomClient, VideoRoomProvider};
