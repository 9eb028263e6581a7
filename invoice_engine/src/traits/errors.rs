use std::{future::Future, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("The service is unavailable: {0}")]
    Unavailable(String),
    #[error("The request was rejected: {0}")]
    Rejected(String),
    #[error("The call did not complete within {0:?}")]
    Timeout(Duration),
    #[error("The service returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Bounds a collaborator call by `limit`. Running out of time is reported as [`CollaboratorError::Timeout`], and is
/// treated like any other failed call.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, CollaboratorError>
where F: Future<Output = Result<T, CollaboratorError>> {
    tokio::time::timeout(limit, call).await.unwrap_or(Err(CollaboratorError::Timeout(limit)))
}
