use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::Json as JsonResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::auth::{require_admin, CurrentUser};
use super::{error_response, ApiError, AppState};
use crate::totp::{EnrollmentState, TotpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct EnableResponse {
    pub secret: String,
    /// Base64-encoded PNG.
    pub qr_code: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub enabled: bool,
    pub state: EnrollmentState,
}

fn totp_error(err: TotpError) -> ApiError {
    match err {
        TotpError::NotEnrolled => error_response(StatusCode::BAD_REQUEST, "TOTP is not enrolled"),
        other => {
            tracing::error!(error = %other, "TOTP operation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// POST /api/totp/enable
pub async fn enable_totp(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<JsonResponse<EnableResponse>, ApiError> {
    let enrollment = state.service.start_enroll(&claims.sub).await.map_err(totp_error)?;

    Ok(JsonResponse(EnableResponse {
        secret: enrollment.secret,
        qr_code: STANDARD.encode(&enrollment.qr_png),
    }))
}

// POST /api/totp/verify
pub async fn verify_totp(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Json(payload): Json<VerifyRequest>,
) -> Result<JsonResponse<VerifyResponse>, ApiError> {
    let ok = state
        .service
        .verify(&claims.sub, &payload.code)
        .await
        .map_err(totp_error)?;

    Ok(JsonResponse(VerifyResponse { ok }))
}

// POST /api/totp/disable
pub async fn disable_totp(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<JsonResponse<serde_json::Value>, ApiError> {
    state.service.disable(&claims.sub).await.map_err(totp_error)?;
    Ok(JsonResponse(serde_json::json!({ "status": "ok" })))
}

// GET /api/totp/status
pub async fn totp_status(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<JsonResponse<StatusResponse>, ApiError> {
    let enrollment = state.service.state(&claims.sub).await.map_err(totp_error)?;
    Ok(JsonResponse(StatusResponse {
        enabled: enrollment == EnrollmentState::Active,
        state: enrollment,
    }))
}

// POST /api/admin/users/:username/totp/disable
pub async fn admin_disable_totp(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(username): Path<String>,
) -> Result<JsonResponse<serde_json::Value>, ApiError> {
    require_admin(&claims)?;
    tracing::info!(admin = %claims.sub, username = %username, "Admin TOTP disable requested");

    state.service.admin_disable(&username).await.map_err(totp_error)?;
    Ok(JsonResponse(serde_json::json!({ "status": "ok" })))
}
