use crate::error::{ErrorKind, PaymentError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorKind,
    message: String,
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidCredential => StatusCode::UNAUTHORIZED,
            ErrorKind::CallbackMismatch | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::GatewayRejected => StatusCode::BAD_GATEWAY,
            ErrorKind::TransactionNotFound => StatusCode::NOT_FOUND,
            ErrorKind::OwnershipViolation => StatusCode::FORBIDDEN,
            ErrorKind::UnsupportedProvider | ErrorKind::Config | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(%status, error = %self, "Payment service error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorBody {
                error: self.kind(),
                message,
            }),
        )
            .into_response()
    }
}
