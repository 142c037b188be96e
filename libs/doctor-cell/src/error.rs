use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DoctorError {
    #[error("Doctor {0} not found")]
    NotFound(Uuid),

    #[error("Doctor {0} is not accepting appointments")]
    Inactive(Uuid),

    #[error("Doctor {0} has no active subscription")]
    SubscriptionNotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DoctorError {
    pub fn action(&self) -> &'static str {
        match self {
            DoctorError::NotFound(_) => "doctor-not-found",
            DoctorError::Inactive(_) => "doctor-inactive",
            DoctorError::SubscriptionNotFound(_) => "subscription-not-found",
            DoctorError::Storage(_) => "storage-error",
        }
    }
}

impl From<anyhow::Error> for DoctorError {
    fn from(e: anyhow::Error) -> Self {
        DoctorError::Storage(e.to_string())
    }
}
