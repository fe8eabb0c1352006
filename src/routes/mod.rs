use axum::{
    http::StatusCode,
    response::Json as JsonResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::totp::TotpService;

pub mod auth;
pub mod totp;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, JsonResponse<ErrorResponse>);

pub fn error_response(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        JsonResponse(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

// App state
#[derive(Clone)]
pub struct AppState {
    pub service: TotpService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(service: TotpService, jwt_secret: &str) -> Self {
        Self {
            service,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

/// Build the HTTP surface. With `totp_enabled` off no TOTP route is mounted.
pub fn router(state: AppState, totp_enabled: bool) -> Router {
    let mut app = Router::new();
    if totp_enabled {
        app = app
            .route("/api/totp/enable", post(totp::enable_totp))
            .route("/api/totp/verify", post(totp::verify_totp))
            .route("/api/totp/disable", post(totp::disable_totp))
            .route("/api/totp/status", get(totp::totp_status))
            .route(
                "/api/admin/users/:username/totp/disable",
                post(totp::admin_disable_totp),
            );
    }
    app.with_state(state)
}
