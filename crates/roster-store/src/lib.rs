//! `roster-store` — SQLite persistence for tasks, push subscriptions and
//! recurring-task definitions.
//!
//! # Overview
//!
//! All rows live in a single SQLite file. Each store wraps its own
//! `Mutex<Connection>` so the gateway handlers can use them concurrently
//! without coordinating. [`db::init_db`] is idempotent and run on every
//! startup.
//!
//! Calendar dates are stored as `YYYY-MM-DD` TEXT in the UTC convention;
//! the callers (pipeline, spawn trigger) pass the date in explicitly so
//! tests can freeze time.

pub mod db;
pub mod error;
pub mod recurring;
pub mod subscriptions;
pub mod tasks;

pub use error::{Result, StoreError};
pub use recurring::{NewRecurringTask, RecurringStore, SpawnOutcome};
pub use subscriptions::SubscriptionStore;
pub use tasks::{NewTask, TaskStore};
