//! Daily reminder pipeline: group today's tasks by assignee, compose one
//! summary payload per user, fan the deliveries out and aggregate a report.
//!
//! The calendar date is a parameter everywhere — the HTTP handler computes
//! "today" (UTC) exactly once and tests freeze it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::warn;

use roster_core::types::{NotificationPayload, Task};
use roster_push::PushService;
use roster_store::{Result as StoreResult, TaskStore};

/// Which date column qualified a task for today's reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMatch {
    /// `execution_date == today`. Wins when both columns match.
    Execution,
    /// `due_date == today`.
    Due,
}

/// Per-user slice of the daily run, returned for operator observability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub user_id: String,
    /// Qualifying tasks grouped under this user.
    pub tasks: usize,
    /// Subscriptions the user had when the dispatch started.
    pub subscriptions: usize,
    pub sent: usize,
    pub failed: usize,
    pub pruned: usize,
    /// True when the user had no registered subscriptions (not an error).
    pub skipped: bool,
    /// Set when the dispatch itself failed before any delivery settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of one daily run.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub tasks_found: usize,
    /// Users for whom at least one delivery succeeded.
    pub users_notified: usize,
    pub details: Vec<UserDetail>,
}

/// Partition tasks by assignee. Tasks without an assignee cannot be
/// notified and are dropped here — deliberately after the server-side
/// query, so `tasks_found` still counts them.
pub fn group_by_assignee(tasks: &[Task]) -> BTreeMap<String, Vec<&Task>> {
    let mut groups: BTreeMap<String, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(user_id) = task.assigned_to.as_deref() {
            groups.entry(user_id.to_string()).or_default().push(task);
        }
    }
    groups
}

/// Which date column put this task in today's run. Execution date is
/// preferred when both match.
pub fn date_match(task: &Task, today: NaiveDate) -> DateMatch {
    if task.execution_date == Some(today) {
        DateMatch::Execution
    } else {
        DateMatch::Due
    }
}

/// One concise payload per user: a single task gets wording that tracks the
/// matched date column; two or more collapse into a bare count (per-task
/// detail is intentionally dropped — one short push notification, not a
/// list).
pub fn compose_payload(user_tasks: &[&Task], today: NaiveDate) -> NotificationPayload {
    let tag = NotificationPayload::daily_tag(today);
    match user_tasks {
        [task] => match date_match(task, today) {
            DateMatch::Execution => NotificationPayload::new(
                "Task scheduled today",
                format!("\"{}\" is scheduled for execution today.", task.title),
                tag,
            ),
            DateMatch::Due => NotificationPayload::new(
                "Task due today",
                format!("\"{}\" is due today.", task.title),
                tag,
            ),
        },
        _ => NotificationPayload::new(
            format!("{} tasks today", user_tasks.len()),
            format!("You have {} tasks due or scheduled today.", user_tasks.len()),
            tag,
        ),
    }
}

/// Execute the full daily run for `today`.
///
/// The task read is the only fatal failure — nothing has been sent at that
/// point. Everything after it settles per user: one user's dispatch failure
/// is recorded in their detail row and never blocks the others.
pub async fn run_daily(
    tasks: &TaskStore,
    push: &PushService,
    today: NaiveDate,
) -> StoreResult<DailySummary> {
    let due = tasks.due_on(today)?;
    let groups = group_by_assignee(&due);

    let dispatches = groups.iter().map(|(user_id, group)| {
        let payload = compose_payload(group, today);
        async move {
            match push.send_to_user(user_id, &payload).await {
                Ok(report) => UserDetail {
                    user_id: user_id.clone(),
                    tasks: group.len(),
                    subscriptions: report.attempted,
                    sent: report.sent,
                    failed: report.failed,
                    pruned: report.pruned,
                    skipped: report.no_subscriptions(),
                    error: None,
                },
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "daily dispatch failed for user");
                    UserDetail {
                        user_id: user_id.clone(),
                        tasks: group.len(),
                        subscriptions: 0,
                        sent: 0,
                        failed: 0,
                        pruned: 0,
                        skipped: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
    });
    let details: Vec<UserDetail> = join_all(dispatches).await;

    Ok(DailySummary {
        tasks_found: due.len(),
        users_notified: details.iter().filter(|d| d.sent > 0).count(),
        details,
    })
}
