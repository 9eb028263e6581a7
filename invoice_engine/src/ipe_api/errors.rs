use ipg_common::UsdCents;
use thiserror::Error;

use crate::{
    db::traits::InvoiceStoreError,
    db_types::{InvoiceId, InvoiceStatus},
    traits::CollaboratorError,
};

#[derive(Debug, Error)]
pub enum InvoiceApiError {
    #[error("Invoice {0} does not exist")]
    InvoiceNotFound(InvoiceId),
    #[error("No invoice is associated with address {0}")]
    NotFoundByAddress(String),
    #[error("Invoice {0} has already been completed")]
    AlreadyCompleted(InvoiceId),
    #[error("Invoice {id} is in status {status}, which does not permit this operation")]
    InvalidState { id: InvoiceId, status: InvoiceStatus },
    #[error("Invoice {id} cannot move from {from} to {to}")]
    InvalidTransition { id: InvoiceId, from: InvoiceStatus, to: InvoiceStatus },
    #[error("Received an unusable price for {symbol}: {price}")]
    InvalidPrice { symbol: String, price: f64 },
    #[error("Invoice amounts must be positive. Got {0}")]
    InvalidAmount(UsdCents),
    #[error("Gas limits must be positive. Got {0}")]
    InvalidGasLimit(i64),
    #[error("Invoice {0} was modified concurrently. Try again.")]
    Conflict(InvoiceId),
    #[error("Could not decode wallet event: {0}")]
    MalformedEvent(String),
    #[error("Collaborator call failed: {0}")]
    CollaboratorError(#[from] CollaboratorError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl InvoiceApiError {
    /// True for errors caused by the request itself, as opposed to failures inside the engine or its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvoiceNotFound(_) |
                Self::NotFoundByAddress(_) |
                Self::AlreadyCompleted(_) |
                Self::InvalidState { .. } |
                Self::InvalidTransition { .. } |
                Self::InvalidAmount(_) |
                Self::InvalidGasLimit(_) |
                Self::Conflict(_) |
                Self::MalformedEvent(_)
        )
    }
}

impl From<InvoiceStoreError> for InvoiceApiError {
    fn from(e: InvoiceStoreError) -> Self {
        match e {
            InvoiceStoreError::NotFound(id) => Self::InvoiceNotFound(id),
            InvoiceStoreError::StatusConflict { id, .. } => Self::Conflict(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
