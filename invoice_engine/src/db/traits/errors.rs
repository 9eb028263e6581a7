use thiserror::Error;

use crate::db_types::{InvoiceId, InvoiceStatus};

#[derive(Debug, Error)]
pub enum InvoiceStoreError {
    #[error("Invoice {0} does not exist")]
    NotFound(InvoiceId),
    #[error("The record already exists: {0}")]
    AlreadyExists(String),
    #[error("Invoice {id} is no longer in status {expected}")]
    StatusConflict { id: InvoiceId, expected: InvoiceStatus },
    #[error("Database driver error: {0}")]
    DriverError(sqlx::Error),
    #[error("Could not serialize invoice snapshot: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<sqlx::Error> for InvoiceStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::AlreadyExists(db_err.message().to_string())
            },
            e => Self::DriverError(e),
        }
    }
}
