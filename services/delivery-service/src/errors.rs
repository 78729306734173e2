use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;
use water_ledger::LedgerError;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid username or password")]
    Unauthenticated,

    #[error("Not Found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        match self {
            ServiceError::Unauthenticated => HttpResponse::build(status_code).json(json!({
                "success": false,
                "error": self.to_string()
            })),
            ServiceError::NotFound => HttpResponse::build(status_code)
                .content_type("text/plain; charset=utf-8")
                .body("Not Found"),
            _ if status_code == StatusCode::BAD_REQUEST => {
                HttpResponse::build(status_code).json(json!({ "error": self.to_string() }))
            }
            _ => HttpResponse::build(status_code)
                .content_type("text/plain; charset=utf-8")
                .body(format!("Error: {}", self)),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Ledger(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            ServiceError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ServiceError {
    /// Short label for logs and metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            ServiceError::Ledger(LedgerError::NegativeQuantity { .. }) => "negative_quantity",
            ServiceError::Ledger(LedgerError::InsufficientEmptyBuckets { .. }) => {
                "insufficient_empty_buckets"
            }
            ServiceError::Ledger(LedgerError::QuantityOverflow) => "quantity_overflow",
            ServiceError::Ledger(LedgerError::Store(_)) => "store_unavailable",
            ServiceError::Ledger(LedgerError::Serialization(_)) => "serialization_error",
            ServiceError::Ledger(LedgerError::KeyCollision(_)) => "key_collision",
            ServiceError::MalformedRequest(_) => "malformed_request",
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::NotFound => "not_found",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
