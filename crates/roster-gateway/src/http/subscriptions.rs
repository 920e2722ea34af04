//! Push subscription lifecycle — register, unsubscribe, key bootstrap.
//!
//! POST /notifications/subscribe    `{"userId": "...", "endpoint": "...",
//!                                    "keys": {"p256dh": "...", "auth": "..."}}`
//! POST /notifications/unsubscribe  `{"endpoint": "..."}`
//! GET  /notifications/vapid-public-key
//!
//! The request body matches the browser's `PushSubscription.toJSON()` shape
//! so the web tier can forward it untouched. Subscribe/unsubscribe use the
//! shared bearer secret (the web tier is the trusted caller); the VAPID
//! public key is public by definition and needs no auth.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use roster_store::StoreError;

use crate::app::AppState;
use crate::auth::check_cron_auth;
use crate::http::ErrorBody;

#[derive(Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub user_id: String,
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub id: String,
}

/// POST /notifications/subscribe — register (or re-home) a browser endpoint.
pub async fn subscribe_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, (StatusCode, Json<ErrorBody>)> {
    if !check_cron_auth(&state, &headers) {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorBody::unauthorized())));
    }

    match state.subscriptions.register(
        &req.user_id,
        &req.endpoint,
        &req.keys.p256dh,
        &req.keys.auth,
    ) {
        Ok(sub) => Ok(Json(SubscribeResponse {
            success: true,
            id: sub.id,
        })),
        Err(e @ StoreError::InvalidField(_)) => {
            Err((StatusCode::BAD_REQUEST, Json(ErrorBody::new(e.to_string()))))
        }
        Err(e) => {
            warn!(error = %e, "POST /notifications/subscribe failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            ))
        }
    }
}

#[derive(Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Serialize)]
pub struct UnsubscribeResponse {
    pub success: bool,
    /// False when the endpoint was already gone — still a success.
    pub removed: bool,
}

/// POST /notifications/unsubscribe — drop a browser endpoint.
pub async fn unsubscribe_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>, (StatusCode, Json<ErrorBody>)> {
    if !check_cron_auth(&state, &headers) {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorBody::unauthorized())));
    }

    match state.subscriptions.remove_endpoint(&req.endpoint) {
        Ok(removed) => Ok(Json(UnsubscribeResponse {
            success: true,
            removed,
        })),
        Err(e) => {
            warn!(error = %e, "POST /notifications/unsubscribe failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            ))
        }
    }
}

/// GET /notifications/vapid-public-key — browser subscription bootstrap.
pub async fn vapid_public_key_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "publicKey": state.config.push.vapid_public_key,
    }))
}
