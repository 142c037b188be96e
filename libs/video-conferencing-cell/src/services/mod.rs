pub mod rooms;
pub mod tokens;

pub use rooms::{room_name_for, UnmanagedRooms, VideoRoomClient, VideoRoomProvider};
