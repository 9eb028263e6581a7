use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use invoice_engine::InvoiceApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the invoice. {0}")]
    Conflict(String),
    #[error("An upstream service failed. {0}")]
    UpstreamError(String),
    #[error("The service is not ready to accept this request. {0}")]
    Unavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<InvoiceApiError> for ServerError {
    fn from(e: InvoiceApiError) -> Self {
        match e {
            InvoiceApiError::InvoiceNotFound(_) | InvoiceApiError::NotFoundByAddress(_) => {
                Self::NoRecordFound(e.to_string())
            },
            InvoiceApiError::AlreadyCompleted(_) |
            InvoiceApiError::InvalidState { .. } |
            InvoiceApiError::InvalidTransition { .. } |
            InvoiceApiError::Conflict(_) => Self::Conflict(e.to_string()),
            InvoiceApiError::InvalidAmount(_) |
            InvoiceApiError::InvalidGasLimit(_) |
            InvoiceApiError::MalformedEvent(_) => Self::InvalidRequestBody(e.to_string()),
            InvoiceApiError::InvalidPrice { .. } | InvoiceApiError::CollaboratorError(_) => {
                Self::UpstreamError(e.to_string())
            },
            InvoiceApiError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}
