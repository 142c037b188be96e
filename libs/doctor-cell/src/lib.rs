pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::DoctorError;
pub use models::*;
pub use services::DoctorService;
pub use store::{DoctorDirectory, MemoryDoctorDirectory, SupabaseDoctorDirectory};
