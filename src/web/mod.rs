pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use routes::{attendance, auth, contact, registration};

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/get-names", get(attendance::get_names_handler))
        .route(
            "/get-attendance-list",
            get(attendance::attendance_list_handler),
        )
        .route("/get-full-list", post(attendance::full_list_handler))
        .route(
            "/get-name-from-phone",
            get(attendance::name_from_phone_handler),
        )
        .route("/mark-present", post(attendance::mark_present_handler))
        .route("/mark-registered", post(attendance::mark_registered_handler))
        .route(
            "/submit-registration",
            post(registration::submit_registration_handler),
        )
        .route("/login", post(auth::login_handler))
        .route("/send-email", post(contact::send_email_handler));

    Router::new()
        .nest("/api", api)
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
