use axum::{extract::State, Json};

use crate::error::AppError;
use crate::models::api_models::{ContactMessageRequest, MessageResponse};
use crate::services::mail_service::OutgoingMail;
use crate::state::AppState;

pub async fn send_email_handler(
    State(state): State<AppState>,
    Json(body): Json<ContactMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::BadRequest("message is required".into()));
    }
    let mailer = state.mailer.as_ref().ok_or(AppError::MailDisabled)?;

    let text = format!(
        "From: {} <{}>\n\n{}",
        body.name.trim(),
        body.email.trim(),
        body.message
    );
    mailer
        .send(OutgoingMail {
            subject: "New Event Registration".into(),
            text,
        })
        .await?;

    Ok(Json(MessageResponse::new("Registration successful")))
}
