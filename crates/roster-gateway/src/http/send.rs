//! Direct send primitive — POST /notifications/send
//!
//! Delivers one payload to every device a user has registered. Used by the
//! trusted web tier for ad-hoc notifications; the daily pipeline uses the
//! same in-process service.
//!
//! Auth: `Authorization: Bearer <cron_secret>`.
//!
//! Request:  `{"userId": "u1", "payload": {"title": "...", "body": "...", ...}}`
//! Response: `{"success": true, "message": "...", "sent": n, "failed": n}`
//! Error:    401 / 400 / 500 with `{"error": "..."}`

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use roster_core::types::NotificationPayload;

use crate::app::AppState;
use crate::auth::check_cron_auth;
use crate::http::ErrorBody;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub user_id: String,
    pub payload: NotificationPayload,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
    pub sent: usize,
    pub failed: usize,
}

/// POST /notifications/send — deliver one payload to all of a user's devices.
pub async fn send_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, (StatusCode, Json<ErrorBody>)> {
    if !check_cron_auth(&state, &headers) {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorBody::unauthorized())));
    }

    if req.user_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("userId is required")),
        ));
    }
    if req.payload.title.trim().is_empty() || req.payload.body.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("payload.title and payload.body are required")),
        ));
    }

    match state.push.send_to_user(&req.user_id, &req.payload).await {
        Ok(report) if report.no_subscriptions() => Ok(Json(SendResponse {
            success: true,
            message: format!("No push subscriptions registered for {}", req.user_id),
            sent: 0,
            failed: 0,
        })),
        Ok(report) => Ok(Json(SendResponse {
            success: true,
            message: format!("Sent to {} of {} device(s)", report.sent, report.attempted),
            sent: report.sent,
            failed: report.failed,
        })),
        Err(e) => {
            warn!(user_id = %req.user_id, error = %e, "POST /notifications/send failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            ))
        }
    }
}
