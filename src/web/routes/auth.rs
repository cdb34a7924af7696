use axum::{extract::State, Json};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::api_models::{LoginRequest, MessageResponse};
use crate::state::AppState;

/// Organizer login: a plain comparison against the configured credentials.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(form): Json<LoginRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let Some(admin) = state.config.admin.as_ref() else {
        warn!("🔐 login attempted but no organizer credentials are configured");
        return Err(AppError::Unauthorized);
    };

    if form.username == admin.username && form.password == admin.password {
        info!(username = %form.username, "🔐 organizer logged in");
        Ok(Json(MessageResponse::new("Login successful")))
    } else {
        warn!(username = %form.username, "🔐 login rejected");
        Err(AppError::Unauthorized)
    }
}
