use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ManutError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown status label: {0:?}")]
    UnknownStatus(String),

    #[error("Ticket #{0} not found")]
    TicketNotFound(u32),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Could not allocate a ticket number after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for ManutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation => {
                ManutError::AlreadyExists("a row with the same key already exists".into())
            }
            StoreError::Unavailable(msg) => ManutError::StoreUnavailable(msg),
            StoreError::Backend(msg) => ManutError::Store(msg),
        }
    }
}

impl ManutError {
    /// Whether the caller supplied bad input (as opposed to an infrastructure failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ManutError::Validation(_)
                | ManutError::UnknownStatus(_)
                | ManutError::TicketNotFound(_)
                | ManutError::AlreadyExists(_)
        )
    }
}
