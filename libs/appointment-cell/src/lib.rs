// libs/appointment-cell/src/lib.rs
//! # Appointment Cell
//!
//! Reservation lifecycle for the four consultation modalities:
//!
//! - **Online**: tiered price frozen at booking, video room on acceptance,
//!   settled when the doctor joins.
//! - **Clinic**: fee frozen at booking, OTP issued on acceptance, settled when
//!   the doctor submits the patient's code.
//! - **Home visit**: doctor quotes travel, patient confirms the total, funds are
//!   frozen then and settled against an OTP.
//! - **Emergency**: no slot; the first responding doctor freezes their fee,
//!   opens a room and settles on finalize.
//!
//! Every reservation write is a compare-and-swap on `version`. Funds move
//! through `wallet-cell` and fee splits come from the doctor's active
//! subscription in `doctor-cell`. `ExpirySweeper` closes reservations whose
//! window has passed.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use services::{
    Actor, AppointmentPolicyConfig, AppointmentService, ExpirySweeper, FeeCalculator, LogNotifier,
    Notifier, SlotConflictChecker, WebhookNotifier,
};
pub use store::{MemoryReservationStore, ReservationStore, SupabaseReservationStore};
