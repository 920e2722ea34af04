//! Recurring-task spawn trigger — GET /cron/spawn-recurring-tasks
//!
//! Invoked once a day by the external scheduler. Pure authenticated
//! pass-through: all date matching and per-day idempotency live in the
//! store's spawn procedure. There is no retry — tomorrow's invocation is
//! the retry.
//!
//! Auth: `Authorization: Bearer <cron_secret>`.
//!
//! Response: `{"success": true, "message": "...", "result": {"matched": n, "created": n, "skipped": n}}`
//! Error:    401 / 500 with `{"error": "..."}`

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use roster_store::SpawnOutcome;

use crate::app::AppState;
use crate::auth::check_cron_auth;
use crate::http::ErrorBody;

#[derive(Serialize)]
pub struct SpawnResponse {
    pub success: bool,
    pub message: String,
    pub result: SpawnOutcome,
}

/// GET /cron/spawn-recurring-tasks — materialise today's recurring tasks.
pub async fn spawn_recurring_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SpawnResponse>, (StatusCode, Json<ErrorBody>)> {
    if !check_cron_auth(&state, &headers) {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorBody::unauthorized())));
    }

    let today = chrono::Utc::now().date_naive();
    match state.recurring.spawn_due(today) {
        Ok(result) => Ok(Json(SpawnResponse {
            success: true,
            message: format!("Recurring task spawn complete for {today}"),
            result,
        })),
        Err(e) => {
            error!(error = %e, "recurring spawn failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            ))
        }
    }
}
