use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use roster_core::RosterConfig;
use roster_push::PushService;
use roster_store::{RecurringStore, SubscriptionStore, TaskStore};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RosterConfig,
    pub tasks: TaskStore,
    /// Shared with the push service, which prunes rows on failed delivery.
    pub subscriptions: Arc<SubscriptionStore>,
    pub recurring: RecurringStore,
    pub push: PushService,
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/cron/spawn-recurring-tasks",
            get(crate::http::spawn::spawn_recurring_handler),
        )
        .route(
            "/notifications/cron/daily",
            get(crate::http::daily::daily_cron_handler),
        )
        .route(
            "/notifications/send",
            post(crate::http::send::send_handler),
        )
        .route(
            "/notifications/subscribe",
            post(crate::http::subscriptions::subscribe_handler),
        )
        .route(
            "/notifications/unsubscribe",
            post(crate::http::subscriptions::unsubscribe_handler),
        )
        .route(
            "/notifications/vapid-public-key",
            get(crate::http::subscriptions::vapid_public_key_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
