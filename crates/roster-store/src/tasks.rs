use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use roster_core::types::{Task, TaskStatus};

use crate::error::{Result, StoreError};

/// Fields for a task insert. `id` and timestamps are generated by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub execution_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub source_recurring_id: Option<String>,
}

impl NewTask {
    /// An open task with only the required fields set.
    pub fn open(title: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::Open,
            due_date: None,
            execution_date: None,
            assigned_to: None,
            created_by: created_by.into(),
            source_recurring_id: None,
        }
    }
}

/// Thread-safe store for task rows.
pub struct TaskStore {
    db: Mutex<Connection>,
}

impl TaskStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Insert a task and return the full row.
    pub fn create(&self, new: NewTask) -> Result<Task> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks
             (id, title, description, status, due_date, execution_date,
              assigned_to, created_by, source_recurring_id, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?10)",
            rusqlite::params![
                id,
                new.title,
                new.description,
                new.status.to_string(),
                new.due_date.map(date_to_sql),
                new.execution_date.map(date_to_sql),
                new.assigned_to,
                new.created_by,
                new.source_recurring_id,
                now,
            ],
        )?;
        debug!(task_id = %id, "task created");

        Ok(Task {
            id,
            title: new.title,
            description: new.description,
            status: new.status,
            due_date: new.due_date,
            execution_date: new.execution_date,
            assigned_to: new.assigned_to,
            created_by: new.created_by,
            source_recurring_id: new.source_recurring_id,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Retrieve a task by id, returning `None` if it does not exist.
    pub fn get(&self, id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            rusqlite::params![id],
            row_to_task,
        ) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// All non-completed tasks whose due date or execution date equals `date`.
    ///
    /// This is the daily pipeline's read: completed tasks are filtered
    /// server-side, null assignees are kept (the pipeline drops them when
    /// grouping, so the count of qualifying tasks stays observable).
    pub fn due_on(&self, date: NaiveDate) -> Result<Vec<Task>> {
        let day = date_to_sql(date);
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE status != 'completed'
               AND (due_date = ?1 OR execution_date = ?1)
             ORDER BY created_at"
        ))?;
        let rows = stmt.query_map(rusqlite::params![day], row_to_task)?;
        let tasks: Vec<Task> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(tasks)
    }

    /// Update a task's status. Returns `NotFound` if no row matches.
    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![status.to_string(), now, id],
        )?;
        if rows_changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, due_date, execution_date,
    assigned_to, created_by, source_recurring_id, created_at, updated_at";

pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn date_from_sql(col: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a SQLite row to a `Task`.
pub(crate) fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let status_str: String = row.get(3)?;
    let status: TaskStatus = status_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    let due_date = row
        .get::<_, Option<String>>(4)?
        .map(|s| date_from_sql(4, &s))
        .transpose()?;
    let execution_date = row
        .get::<_, Option<String>>(5)?
        .map(|s| date_from_sql(5, &s))
        .transpose()?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status,
        due_date,
        execution_date,
        assigned_to: row.get(6)?,
        created_by: row.get(7)?,
        source_recurring_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn store() -> TaskStore {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        TaskStore::new(conn)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = store();
        let mut new = NewTask::open("Water the plants", "mgr-1");
        new.due_date = Some(day(2026, 3, 9));
        new.assigned_to = Some("u1".into());
        let created = store.create(new).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Water the plants");
        assert_eq!(fetched.due_date, Some(day(2026, 3, 9)));
        assert_eq!(fetched.status, TaskStatus::Open);
    }

    #[test]
    fn due_on_matches_either_date_column() {
        let store = store();
        let today = day(2026, 3, 9);

        let mut by_due = NewTask::open("due today", "mgr-1");
        by_due.due_date = Some(today);
        store.create(by_due).unwrap();

        let mut by_exec = NewTask::open("exec today", "mgr-1");
        by_exec.execution_date = Some(today);
        store.create(by_exec).unwrap();

        let mut other_day = NewTask::open("tomorrow", "mgr-1");
        other_day.due_date = Some(day(2026, 3, 10));
        store.create(other_day).unwrap();

        let due = store.due_on(today).unwrap();
        let mut titles: Vec<_> = due.iter().map(|t| t.title.as_str()).collect();
        titles.sort_unstable();
        assert_eq!(titles, vec!["due today", "exec today"]);
    }

    #[test]
    fn due_on_excludes_completed_tasks() {
        let store = store();
        let today = day(2026, 3, 9);

        let mut done = NewTask::open("already done", "mgr-1");
        done.due_date = Some(today);
        done.status = TaskStatus::Completed;
        store.create(done).unwrap();

        let mut open = NewTask::open("still open", "mgr-1");
        open.due_date = Some(today);
        store.create(open).unwrap();

        let due = store.due_on(today).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "still open");
    }

    #[test]
    fn due_on_keeps_unassigned_tasks() {
        // Null assignees are dropped later, when grouping — not here.
        let store = store();
        let today = day(2026, 3, 9);
        let mut new = NewTask::open("nobody's task", "mgr-1");
        new.due_date = Some(today);
        store.create(new).unwrap();

        let due = store.due_on(today).unwrap();
        assert_eq!(due.len(), 1);
        assert!(due[0].assigned_to.is_none());
    }

    #[test]
    fn set_status_unknown_id_is_not_found() {
        let store = store();
        let err = store.set_status("missing", TaskStatus::Completed).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
