use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::database::SheetError;
use crate::models::api_models::MessageResponse;
use crate::services::mail_service::MailError;
use crate::services::matching::ColumnError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("{0}")]
    AttendeeNotFound(String),

    #[error(transparent)]
    Column(#[from] ColumnError),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("mail is not configured")]
    MailDisabled,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AttendeeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Sheet(SheetError::Upstream { .. } | SheetError::Transport(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::MailDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Column(_) | AppError::Sheet(_) | AppError::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The text a caller sees. Remote and configuration details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(_) | AppError::Unauthorized | AppError::AttendeeNotFound(_) => {
                self.to_string()
            }
            AppError::MailDisabled => "Mail is not available".to_string(),
            AppError::Column(_) | AppError::Sheet(_) | AppError::Mail(_) => {
                "Request failed, please try again later".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }

        (status, Json(MessageResponse::new(self.public_message()))).into_response()
    }
}
