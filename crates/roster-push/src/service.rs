use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use roster_core::types::NotificationPayload;
use roster_store::SubscriptionStore;

use crate::error::Result;
use crate::transport::PushTransport;

/// Outcome of one per-user send, suitable for the HTTP response breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct SendReport {
    pub user_id: String,
    /// Subscriptions the user had when the send started.
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    /// Subscriptions deleted because their endpoint rejected delivery.
    pub pruned: usize,
}

impl SendReport {
    /// True when the user had nothing registered — "nothing to do", which is
    /// deliberately distinct from "something failed".
    pub fn no_subscriptions(&self) -> bool {
        self.attempted == 0
    }

    fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            attempted: 0,
            sent: 0,
            failed: 0,
            pruned: 0,
        }
    }
}

/// Fans one payload out to all of a user's registered devices.
///
/// Deliveries are issued concurrently and all attempts settle before the
/// report is returned. A failed attempt prunes exactly that subscription;
/// siblings are unaffected. Pruning a row that is already gone is tolerated
/// (deletion is idempotent), so concurrent runs never trip over each other.
pub struct PushService {
    subscriptions: Arc<SubscriptionStore>,
    transport: Arc<dyn PushTransport>,
}

impl PushService {
    pub fn new(subscriptions: Arc<SubscriptionStore>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            subscriptions,
            transport,
        }
    }

    /// Deliver `payload` to every subscription `user_id` has registered.
    ///
    /// Returns an error only when the subscription read or the payload
    /// serialization fails; individual delivery failures are converted into
    /// counts plus pruning side effects.
    pub async fn send_to_user(
        &self,
        user_id: &str,
        payload: &NotificationPayload,
    ) -> Result<SendReport> {
        let subs = self.subscriptions.list_for_user(user_id)?;
        if subs.is_empty() {
            debug!(user_id, "no push subscriptions — nothing to send");
            return Ok(SendReport::empty(user_id));
        }

        let bytes = serde_json::to_vec(payload)?;
        let body = bytes.as_slice();

        let attempts = subs
            .iter()
            .map(|sub| async move { (sub, self.transport.deliver(sub, body).await) });
        let settled = join_all(attempts).await;

        let mut report = SendReport::empty(user_id);
        report.attempted = subs.len();
        for (sub, outcome) in settled {
            match outcome {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        user_id,
                        endpoint = %sub.endpoint,
                        error = %e,
                        "push delivery failed — pruning subscription"
                    );
                    match self.subscriptions.remove_endpoint(&sub.endpoint) {
                        Ok(true) => report.pruned += 1,
                        Ok(false) => {}
                        Err(e) => {
                            warn!(endpoint = %sub.endpoint, error = %e, "prune failed");
                        }
                    }
                }
            }
        }

        debug!(
            user_id,
            sent = report.sent,
            failed = report.failed,
            pruned = report.pruned,
            "push fan-out settled"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roster_core::types::PushSubscription;
    use roster_store::db::init_db;
    use rusqlite::Connection;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::error::PushError;

    /// Records every delivery and fails those whose endpoint is listed.
    struct MockTransport {
        delivered: Mutex<Vec<(String, Vec<u8>)>>,
        failing: HashSet<String>,
    }

    impl MockTransport {
        fn new(failing: &[&str]) -> Self {
            Self {
                delivered: Mutex::new(Vec::new()),
                failing: failing.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl PushTransport for MockTransport {
        async fn deliver(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()> {
            if self.failing.contains(&subscription.endpoint) {
                return Err(PushError::Delivery("410 Gone".to_string()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((subscription.endpoint.clone(), payload.to_vec()));
            Ok(())
        }
    }

    fn store() -> Arc<SubscriptionStore> {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        Arc::new(SubscriptionStore::new(conn))
    }

    fn payload() -> NotificationPayload {
        NotificationPayload::new("Task due today", "\"Inventory\" is due today.", "tasks-2026-03-09")
    }

    #[tokio::test]
    async fn no_subscriptions_is_success_not_error() {
        let service = PushService::new(store(), Arc::new(MockTransport::new(&[])));
        let report = service.send_to_user("u1", &payload()).await.unwrap();
        assert!(report.no_subscriptions());
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn delivers_to_every_device() {
        let subs = store();
        subs.register("u1", "https://push.example/a", "k", "a").unwrap();
        subs.register("u1", "https://push.example/b", "k", "a").unwrap();

        let transport = Arc::new(MockTransport::new(&[]));
        let service = PushService::new(Arc::clone(&subs), transport.clone());
        let report = service.send_to_user("u1", &payload()).await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);

        let delivered = transport.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        // The bytes on the wire are the payload JSON.
        let body: serde_json::Value = serde_json::from_slice(&delivered[0].1).unwrap();
        assert_eq!(body["title"], "Task due today");
        assert_eq!(body["tag"], "tasks-2026-03-09");
    }

    #[tokio::test]
    async fn failing_endpoint_is_pruned_others_survive() {
        let subs = store();
        subs.register("u1", "https://push.example/dead", "k", "a").unwrap();
        subs.register("u1", "https://push.example/alive", "k", "a").unwrap();

        let transport = Arc::new(MockTransport::new(&["https://push.example/dead"]));
        let service = PushService::new(Arc::clone(&subs), transport);
        let report = service.send_to_user("u1", &payload()).await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pruned, 1);

        let remaining = subs.list_for_user("u1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].endpoint, "https://push.example/alive");
    }

    #[tokio::test]
    async fn all_endpoints_dead_reports_zero_sent() {
        let subs = store();
        subs.register("u1", "https://push.example/dead", "k", "a").unwrap();

        let transport = Arc::new(MockTransport::new(&["https://push.example/dead"]));
        let service = PushService::new(Arc::clone(&subs), transport);
        let report = service.send_to_user("u1", &payload()).await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
        assert!(subs.list_for_user("u1").unwrap().is_empty());
    }
}
