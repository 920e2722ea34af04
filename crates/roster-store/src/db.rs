use rusqlite::Connection;

use crate::error::Result;

/// Initialise the roster schema in `conn`.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
/// Dates are `YYYY-MM-DD` TEXT, timestamps ISO-8601 TEXT, booleans
/// INTEGER 0/1 (STRICT tables have no BOOLEAN affinity).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT    NOT NULL PRIMARY KEY,
            title               TEXT    NOT NULL,
            description         TEXT,
            status              TEXT    NOT NULL DEFAULT 'open',
            due_date            TEXT,               -- YYYY-MM-DD or NULL
            execution_date      TEXT,               -- YYYY-MM-DD or NULL
            assigned_to         TEXT,               -- user id or NULL
            created_by          TEXT    NOT NULL,
            source_recurring_id TEXT,               -- set on spawned instances
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL
        ) STRICT;

        -- The daily pipeline filters on both date columns.
        CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks (due_date);
        CREATE INDEX IF NOT EXISTS idx_tasks_execution_date ON tasks (execution_date);
        -- Per-day spawn idempotency check.
        CREATE INDEX IF NOT EXISTS idx_tasks_recurring_day
            ON tasks (source_recurring_id, due_date);

        CREATE TABLE IF NOT EXISTS push_subscriptions (
            id          TEXT NOT NULL PRIMARY KEY,
            user_id     TEXT NOT NULL,
            endpoint    TEXT NOT NULL UNIQUE,
            p256dh      TEXT NOT NULL,
            auth        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_push_subscriptions_user
            ON push_subscriptions (user_id);

        CREATE TABLE IF NOT EXISTS recurring_tasks (
            id           TEXT    NOT NULL PRIMARY KEY,
            title        TEXT    NOT NULL,
            description  TEXT,
            frequency    TEXT    NOT NULL,           -- 'weekly' | 'monthly'
            day_selector INTEGER NOT NULL,           -- weekday 0-6 (Mon=0) or day-of-month 1-31
            start_date   TEXT    NOT NULL,           -- YYYY-MM-DD
            end_date     TEXT,                       -- YYYY-MM-DD or NULL
            assigned_to  TEXT,
            active       INTEGER NOT NULL DEFAULT 1,
            created_by   TEXT    NOT NULL,
            created_at   TEXT    NOT NULL,
            updated_at   TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_recurring_tasks_active
            ON recurring_tasks (active);
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_db_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }
}
