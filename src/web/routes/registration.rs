use axum::{extract::State, Json};
use tracing::info;

use crate::error::AppError;
use crate::models::api_models::{RegistrationForm, RegistrationOutcome, RegistrationResponse};
use crate::services::registration_service;
use crate::state::AppState;

pub async fn submit_registration_handler(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> Result<Json<RegistrationResponse>, AppError> {
    info!(name = %form.name.trim(), attendance_page = form.is_attendance_page, "📝 registration received");

    let outcome = registration_service::submit_registration(&state, &form).await?;
    let message = match outcome {
        RegistrationOutcome::Created => "Registration successful",
        RegistrationOutcome::Updated => "Registration updated",
        RegistrationOutcome::Unchanged => "Already registered",
    };

    Ok(Json(RegistrationResponse {
        message: message.to_string(),
        outcome,
    }))
}
