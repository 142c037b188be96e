pub mod appointment;
pub mod booking;
pub mod conflict;
pub mod fees;
pub mod lifecycle;
pub mod notification;
pub mod otp;
pub mod settlement;
pub mod sweeper;
pub mod transitions;

pub use appointment::{Actor, AppointmentService};
pub use conflict::SlotConflictChecker;
pub use fees::FeeCalculator;
pub use lifecycle::{AcceptedExpiryPolicy, AppointmentPolicyConfig, FreezeStage, ModalityPolicy};
pub use notification::{LogNotifier, NotificationEvent, Notifier, WebhookNotifier};
pub use otp::{OtpGate, OtpVerified};
pub use sweeper::{ExpirySweeper, ModalitySweep};
