use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use roster_core::types::{Frequency, RecurringTask};

use crate::error::{Result, StoreError};
use crate::tasks::{date_from_sql, date_to_sql};

/// Fields for a definition insert. `id` and timestamps are generated.
#[derive(Debug, Clone)]
pub struct NewRecurringTask {
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    /// Weekday 0–6 (Monday = 0) for weekly, day-of-month 1–31 for monthly.
    pub day_selector: u8,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    pub created_by: String,
}

/// Result of one spawn run, returned verbatim to the trigger endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SpawnOutcome {
    /// Active definitions whose schedule matched the date.
    pub matched: u32,
    /// Task instances actually inserted.
    pub created: u32,
    /// Matches skipped because an instance for that day already existed.
    pub skipped: u32,
}

/// Thread-safe store for recurring-task definitions, including the daily
/// spawn procedure.
///
/// The spawn procedure writes task rows directly — it is the Rust rendition
/// of what the original deployment ran as a database-side procedure, and it
/// is idempotent per calendar day: re-running it on the same date creates
/// nothing new.
pub struct RecurringStore {
    db: Mutex<Connection>,
}

impl RecurringStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Insert a definition and return the full row.
    pub fn create(&self, new: NewRecurringTask) -> Result<RecurringTask> {
        validate_day_selector(new.frequency, new.day_selector)?;

        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO recurring_tasks
             (id, title, description, frequency, day_selector, start_date,
              end_date, assigned_to, active, created_by, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,1,?9,?10,?10)",
            rusqlite::params![
                id,
                new.title,
                new.description,
                new.frequency.to_string(),
                new.day_selector as i64,
                date_to_sql(new.start_date),
                new.end_date.map(date_to_sql),
                new.assigned_to,
                new.created_by,
                now,
            ],
        )?;
        info!(recurring_id = %id, title = %new.title, "recurring definition created");

        Ok(RecurringTask {
            id,
            title: new.title,
            description: new.description,
            frequency: new.frequency,
            day_selector: new.day_selector,
            start_date: new.start_date,
            end_date: new.end_date,
            assigned_to: new.assigned_to,
            active: true,
            created_by: new.created_by,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// All definitions, newest first.
    pub fn list(&self) -> Result<Vec<RecurringTask>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, title, description, frequency, day_selector, start_date,
                    end_date, assigned_to, active, created_by, created_at, updated_at
             FROM recurring_tasks ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], row_to_recurring)?;
        let defs: Vec<RecurringTask> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(defs)
    }

    /// Flip the active flag. Returns `NotFound` if no row matches.
    pub fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE recurring_tasks SET active = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![active as i64, now, id],
        )?;
        if rows_changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Materialise task instances for every active definition whose schedule
    /// matches `today`, skipping definitions that already spawned for that
    /// date. Runs in one transaction.
    pub fn spawn_due(&self, today: NaiveDate) -> Result<SpawnOutcome> {
        let day = date_to_sql(today);
        let now = chrono::Utc::now().to_rfc3339();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;

        // Collect eagerly so the statement is dropped before the inserts
        // borrow the transaction.
        let candidates: Vec<RecurringTask> = {
            let mut stmt = tx.prepare(
                "SELECT id, title, description, frequency, day_selector, start_date,
                        end_date, assigned_to, active, created_by, created_at, updated_at
                 FROM recurring_tasks
                 WHERE active = 1
                   AND start_date <= ?1
                   AND (end_date IS NULL OR end_date >= ?1)",
            )?;
            let rows = stmt.query_map(rusqlite::params![day], row_to_recurring)?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut outcome = SpawnOutcome::default();
        for def in candidates {
            if !fires_on(def.frequency, def.day_selector, today) {
                continue;
            }
            outcome.matched += 1;

            let already_spawned: bool = tx.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM tasks
                     WHERE source_recurring_id = ?1 AND due_date = ?2)",
                rusqlite::params![def.id, day],
                |row| row.get(0),
            )?;
            if already_spawned {
                debug!(recurring_id = %def.id, %day, "instance already exists — skipping");
                outcome.skipped += 1;
                continue;
            }

            let task_id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO tasks
                 (id, title, description, status, due_date, execution_date,
                  assigned_to, created_by, source_recurring_id, created_at, updated_at)
                 VALUES (?1,?2,?3,'open',?4,NULL,?5,?6,?7,?8,?8)",
                rusqlite::params![
                    task_id,
                    def.title,
                    def.description,
                    day,
                    def.assigned_to,
                    def.created_by,
                    def.id,
                    now,
                ],
            )?;
            outcome.created += 1;
        }

        tx.commit()?;
        info!(
            %day,
            matched = outcome.matched,
            created = outcome.created,
            skipped = outcome.skipped,
            "recurring spawn run complete"
        );
        Ok(outcome)
    }
}

/// Whether a definition's schedule matches `date`.
///
/// Weekly uses 0 = Monday … 6 = Sunday. Monthly matches the day-of-month
/// exactly — a 31 selector never fires in April.
fn fires_on(frequency: Frequency, day_selector: u8, date: NaiveDate) -> bool {
    match frequency {
        Frequency::Weekly => date.weekday().num_days_from_monday() == day_selector as u32,
        Frequency::Monthly => date.day() == day_selector as u32,
    }
}

fn validate_day_selector(frequency: Frequency, day_selector: u8) -> Result<()> {
    let ok = match frequency {
        Frequency::Weekly => day_selector <= 6,
        Frequency::Monthly => (1..=31).contains(&day_selector),
    };
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidField(format!(
            "day selector {day_selector} is out of range for {frequency} recurrence"
        )))
    }
}

/// Map a SQLite row to a `RecurringTask`.
fn row_to_recurring(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecurringTask> {
    let frequency_str: String = row.get(3)?;
    let frequency: Frequency = frequency_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    let start_raw: String = row.get(5)?;
    let start_date = date_from_sql(5, &start_raw)?;
    let end_date = row
        .get::<_, Option<String>>(6)?
        .map(|s| date_from_sql(6, &s))
        .transpose()?;

    Ok(RecurringTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        frequency,
        day_selector: row.get::<_, i64>(4)? as u8,
        start_date,
        end_date,
        assigned_to: row.get(7)?,
        active: row.get::<_, i64>(8)? != 0,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::tasks::TaskStore;

    struct Fixture {
        recurring: RecurringStore,
        tasks: TaskStore,
    }

    /// The spawn tests need two stores over the same database. A named
    /// shared-cache in-memory database gives each fixture its own isolated
    /// instance that lives as long as at least one connection is open.
    fn fixture() -> Fixture {
        let uri = format!(
            "file:recurring-{}?mode=memory&cache=shared",
            Uuid::new_v4()
        );
        let conn = Connection::open(&uri).unwrap();
        init_db(&conn).unwrap();
        let tasks_conn = Connection::open(&uri).unwrap();
        Fixture {
            recurring: RecurringStore::new(conn),
            tasks: TaskStore::new(tasks_conn),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly_def(day_selector: u8) -> NewRecurringTask {
        NewRecurringTask {
            title: "Weekly stand-up prep".into(),
            description: None,
            frequency: Frequency::Weekly,
            day_selector,
            start_date: day(2026, 1, 1),
            end_date: None,
            assigned_to: Some("u1".into()),
            created_by: "mgr-1".into(),
        }
    }

    #[test]
    fn fires_on_weekly_uses_monday_zero() {
        // 2026-03-09 is a Monday.
        assert!(fires_on(Frequency::Weekly, 0, day(2026, 3, 9)));
        assert!(!fires_on(Frequency::Weekly, 1, day(2026, 3, 9)));
        // Sunday = 6.
        assert!(fires_on(Frequency::Weekly, 6, day(2026, 3, 15)));
    }

    #[test]
    fn fires_on_monthly_needs_exact_day() {
        assert!(fires_on(Frequency::Monthly, 15, day(2026, 4, 15)));
        assert!(!fires_on(Frequency::Monthly, 15, day(2026, 4, 14)));
        // April has no 31st — the definition just does not fire.
        assert!(!fires_on(Frequency::Monthly, 31, day(2026, 4, 30)));
    }

    #[test]
    fn spawn_creates_instance_on_matching_day() {
        let fx = fixture();
        fx.recurring.create(weekly_def(0)).unwrap();

        let monday = day(2026, 3, 9);
        let outcome = fx.recurring.spawn_due(monday).unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped, 0);

        let spawned = fx.tasks.due_on(monday).unwrap();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].title, "Weekly stand-up prep");
        assert_eq!(spawned[0].assigned_to.as_deref(), Some("u1"));
        assert!(spawned[0].source_recurring_id.is_some());
        assert_eq!(spawned[0].due_date, Some(monday));
    }

    #[test]
    fn spawn_is_idempotent_per_day() {
        let fx = fixture();
        fx.recurring.create(weekly_def(0)).unwrap();

        let monday = day(2026, 3, 9);
        fx.recurring.spawn_due(monday).unwrap();
        let second = fx.recurring.spawn_due(monday).unwrap();
        assert_eq!(second.matched, 1);
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 1);

        assert_eq!(fx.tasks.due_on(monday).unwrap().len(), 1);

        // The following Monday spawns a fresh instance.
        let next_monday = day(2026, 3, 16);
        let next = fx.recurring.spawn_due(next_monday).unwrap();
        assert_eq!(next.created, 1);
    }

    #[test]
    fn spawn_skips_non_matching_days_and_inactive_defs() {
        let fx = fixture();
        let def = fx.recurring.create(weekly_def(0)).unwrap();

        // Tuesday: no match at all.
        let tuesday = day(2026, 3, 10);
        let outcome = fx.recurring.spawn_due(tuesday).unwrap();
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.created, 0);

        // Deactivated definitions never spawn, even on their day.
        fx.recurring.set_active(&def.id, false).unwrap();
        let monday = day(2026, 3, 9);
        let outcome = fx.recurring.spawn_due(monday).unwrap();
        assert_eq!(outcome.matched, 0);
    }

    #[test]
    fn spawn_honors_start_and_end_window() {
        let fx = fixture();
        let mut def = weekly_def(0);
        def.start_date = day(2026, 3, 10);
        def.end_date = Some(day(2026, 3, 20));
        fx.recurring.create(def).unwrap();

        // Monday before the window opens.
        assert_eq!(fx.recurring.spawn_due(day(2026, 3, 9)).unwrap().created, 0);
        // Monday inside the window.
        assert_eq!(fx.recurring.spawn_due(day(2026, 3, 16)).unwrap().created, 1);
        // Monday after the window closed.
        assert_eq!(fx.recurring.spawn_due(day(2026, 3, 23)).unwrap().created, 0);
    }

    #[test]
    fn monthly_def_spawns_on_day_of_month() {
        let fx = fixture();
        fx.recurring
            .create(NewRecurringTask {
                title: "Monthly report".into(),
                description: Some("Compile the numbers".into()),
                frequency: Frequency::Monthly,
                day_selector: 15,
                start_date: day(2026, 1, 1),
                end_date: None,
                assigned_to: Some("u2".into()),
                created_by: "mgr-1".into(),
            })
            .unwrap();

        assert_eq!(fx.recurring.spawn_due(day(2026, 4, 15)).unwrap().created, 1);
        assert_eq!(fx.recurring.spawn_due(day(2026, 4, 16)).unwrap().matched, 0);
    }

    #[test]
    fn list_returns_all_definitions_with_flags() {
        let fx = fixture();
        let def = fx.recurring.create(weekly_def(0)).unwrap();
        fx.recurring.create(weekly_def(3)).unwrap();
        fx.recurring.set_active(&def.id, false).unwrap();

        let defs = fx.recurring.list().unwrap();
        assert_eq!(defs.len(), 2);
        let deactivated = defs.iter().find(|d| d.id == def.id).unwrap();
        assert!(!deactivated.active);
    }

    #[test]
    fn create_rejects_out_of_range_selector() {
        let fx = fixture();
        let def = weekly_def(7);
        assert!(matches!(
            fx.recurring.create(def).unwrap_err(),
            StoreError::InvalidField(_)
        ));

        let monthly = NewRecurringTask {
            title: "bad".into(),
            description: None,
            frequency: Frequency::Monthly,
            day_selector: 0,
            start_date: day(2026, 1, 1),
            end_date: None,
            assigned_to: None,
            created_by: "mgr-1".into(),
        };
        assert!(fx.recurring.create(monthly).is_err());
    }
}
