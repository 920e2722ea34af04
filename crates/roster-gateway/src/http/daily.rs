//! Daily due-task reminder run — GET /notifications/cron/daily
//!
//! Invoked once a day by the external scheduler. Reads today's qualifying
//! tasks, groups them by assignee, sends one push summary per user and
//! prunes dead subscriptions. Settle-all semantics: every delivery attempt
//! finishes before the summary is returned.
//!
//! Auth: `Authorization: Bearer <cron_secret>`.
//!
//! Response: `{"success": true, "message": "...", "tasksFound": n,
//!             "notificationsSent": n, "details": [...]}`
//! Error:    401 / 500 with `{"error": "..."}`

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::app::AppState;
use crate::auth::check_cron_auth;
use crate::http::ErrorBody;
use crate::pipeline::{self, UserDetail};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCronResponse {
    pub success: bool,
    pub message: String,
    pub tasks_found: usize,
    pub notifications_sent: usize,
    pub details: Vec<UserDetail>,
}

/// GET /notifications/cron/daily — run the reminder pipeline for today (UTC).
pub async fn daily_cron_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DailyCronResponse>, (StatusCode, Json<ErrorBody>)> {
    if !check_cron_auth(&state, &headers) {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorBody::unauthorized())));
    }

    // The pipeline takes the date explicitly; this is the single place the
    // wall clock is read.
    let today = chrono::Utc::now().date_naive();
    match pipeline::run_daily(&state.tasks, &state.push, today).await {
        Ok(summary) => {
            info!(
                %today,
                tasks_found = summary.tasks_found,
                users_notified = summary.users_notified,
                "daily reminder run complete"
            );
            Ok(Json(DailyCronResponse {
                success: true,
                message: format!("Daily reminder run complete for {today}"),
                tasks_found: summary.tasks_found,
                notifications_sent: summary.users_notified,
                details: summary.details,
            }))
        }
        Err(e) => {
            error!(error = %e, "daily reminder run failed before dispatch");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            ))
        }
    }
}
