use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use roster_core::types::PushSubscription;

use crate::error::{Result, StoreError};

/// Thread-safe store for browser push registrations.
///
/// Rows are keyed by the browser-issued endpoint URL: a device re-registering
/// the same endpoint re-homes the row (upsert) instead of duplicating it.
/// Deletion is idempotent — pruning an endpoint that is already gone is not
/// an error, so concurrent prune branches never conflict.
pub struct SubscriptionStore {
    db: Mutex<Connection>,
}

impl SubscriptionStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Register (or re-home) a subscription and return the stored row.
    pub fn register(
        &self,
        user_id: &str,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<PushSubscription> {
        if user_id.is_empty() || endpoint.is_empty() || p256dh.is_empty() || auth.is_empty() {
            return Err(StoreError::InvalidField(
                "subscription requires user_id, endpoint, p256dh and auth".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO push_subscriptions (id, user_id, endpoint, p256dh, auth, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(endpoint) DO UPDATE SET
                 user_id = excluded.user_id,
                 p256dh  = excluded.p256dh,
                 auth    = excluded.auth",
            rusqlite::params![id, user_id, endpoint, p256dh, auth, now],
        )?;

        // Read back — on conflict the original id and created_at survive.
        let sub = db.query_row(
            "SELECT id, user_id, endpoint, p256dh, auth, created_at
             FROM push_subscriptions WHERE endpoint = ?1",
            rusqlite::params![endpoint],
            row_to_subscription,
        )?;
        debug!(user_id, endpoint, "push subscription registered");
        Ok(sub)
    }

    /// All subscriptions registered by `user_id` (one per device/browser).
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<PushSubscription>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, endpoint, p256dh, auth, created_at
             FROM push_subscriptions
             WHERE user_id = ?1
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id], row_to_subscription)?;
        let subs: Vec<PushSubscription> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(subs)
    }

    /// Delete the subscription with this endpoint.
    ///
    /// Returns `true` if a row was removed, `false` if it was already gone.
    pub fn remove_endpoint(&self, endpoint: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "DELETE FROM push_subscriptions WHERE endpoint = ?1",
            rusqlite::params![endpoint],
        )?;
        if rows_changed > 0 {
            info!(endpoint, "push subscription removed");
        }
        Ok(rows_changed > 0)
    }
}

/// Map a SQLite row to a `PushSubscription`.
fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<PushSubscription> {
    Ok(PushSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        endpoint: row.get(2)?,
        p256dh: row.get(3)?,
        auth: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn store() -> SubscriptionStore {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        SubscriptionStore::new(conn)
    }

    #[test]
    fn register_and_list() {
        let store = store();
        store
            .register("u1", "https://push.example/ep-a", "key-a", "auth-a")
            .unwrap();
        store
            .register("u1", "https://push.example/ep-b", "key-b", "auth-b")
            .unwrap();
        store
            .register("u2", "https://push.example/ep-c", "key-c", "auth-c")
            .unwrap();

        let subs = store.list_for_user("u1").unwrap();
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.user_id == "u1"));
        assert_eq!(store.list_for_user("u2").unwrap().len(), 1);
        assert!(store.list_for_user("u3").unwrap().is_empty());
    }

    #[test]
    fn same_endpoint_re_registration_is_upsert() {
        let store = store();
        let first = store
            .register("u1", "https://push.example/ep-a", "key-a", "auth-a")
            .unwrap();
        // Same browser endpoint, now owned by another login on the device.
        let second = store
            .register("u2", "https://push.example/ep-a", "key-a2", "auth-a2")
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.user_id, "u2");
        assert_eq!(second.p256dh, "key-a2");
        assert!(store.list_for_user("u1").unwrap().is_empty());
    }

    #[test]
    fn remove_endpoint_is_idempotent() {
        let store = store();
        store
            .register("u1", "https://push.example/ep-a", "key-a", "auth-a")
            .unwrap();

        assert!(store.remove_endpoint("https://push.example/ep-a").unwrap());
        // Second delete is a no-op, not an error.
        assert!(!store.remove_endpoint("https://push.example/ep-a").unwrap());
        assert!(store.list_for_user("u1").unwrap().is_empty());
    }

    #[test]
    fn register_rejects_empty_fields() {
        let store = store();
        let err = store.register("u1", "", "k", "a").unwrap_err();
        assert!(matches!(err, StoreError::InvalidField(_)));
    }
}
