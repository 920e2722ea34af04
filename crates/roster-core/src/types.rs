use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up.
    Open,
    /// The assignee has started working on it.
    InProgress,
    /// Done — completed tasks never trigger reminders.
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A concrete task row.
///
/// `due_date` and `execution_date` are calendar dates (UTC convention — the
/// same convention the daily pipeline uses to compute "today").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// UUID v4 string — primary key.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Deadline, if any.
    pub due_date: Option<NaiveDate>,
    /// Planned hands-on date, if any. Distinct from the deadline: a task can
    /// be scheduled for execution days before it is due.
    pub execution_date: Option<NaiveDate>,
    /// The user the task is delegated to. Unassigned tasks are never
    /// included in reminder notifications.
    pub assigned_to: Option<String>,
    pub created_by: String,
    /// Set on instances spawned from a recurring definition.
    pub source_recurring_id: Option<String>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 timestamp of the last update.
    pub updated_at: String,
}

/// A browser push registration: one row per device/browser instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    /// UUID v4 string — primary key.
    pub id: String,
    /// Owner — the user this device notifies.
    pub user_id: String,
    /// Opaque delivery URL issued by the browser's push service.
    pub endpoint: String,
    /// Client public key for payload encryption (URL-safe base64).
    pub p256dh: String,
    /// Client authentication secret (URL-safe base64).
    pub auth: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// How often a recurring definition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// `day_selector` is a weekday, 0 = Monday … 6 = Sunday.
    Weekly,
    /// `day_selector` is a day of month, 1–31. Months without that day
    /// simply produce no instance.
    Monthly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

/// A template that spawns concrete [`Task`] instances on a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTask {
    /// UUID v4 string — primary key.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    /// Weekday 0–6 (Monday = 0) for weekly, day-of-month 1–31 for monthly.
    pub day_selector: u8,
    /// First calendar day the definition may fire.
    pub start_date: NaiveDate,
    /// Last calendar day the definition may fire, if bounded.
    pub end_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    /// Inactive definitions are kept for history but never spawn.
    pub active: bool,
    pub created_by: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 timestamp of the last update.
    pub updated_at: String,
}

/// The JSON document delivered inside an encrypted push message.
///
/// The service worker on the client side reads these fields to render the
/// browser notification; `tag` lets the browser collapse same-day repeats
/// into a single visible alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Click-through target, relative to the web app origin.
    #[serde(default = "default_url")]
    pub url: String,
    /// Semantic type tag for the service worker ("task-reminder", …).
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Deduplication tag; same tag replaces a visible notification instead
    /// of stacking a new one.
    #[serde(default)]
    pub tag: String,
}

fn default_icon() -> String {
    "/icons/icon-192.png".to_string()
}
fn default_url() -> String {
    "/tasks".to_string()
}
fn default_kind() -> String {
    "task-reminder".to_string()
}

impl NotificationPayload {
    /// Payload with the standard icon, target URL and type tag.
    pub fn new(title: impl Into<String>, body: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: default_icon(),
            url: default_url(),
            kind: default_kind(),
            tag: tag.into(),
        }
    }

    /// Date-scoped deduplication tag for daily reminders: `tasks-YYYY-MM-DD`.
    ///
    /// Running the daily pipeline twice on the same date yields the same tag
    /// both times, so browsers show only the latest reminder.
    pub fn daily_tag(date: NaiveDate) -> String {
        format!("tasks-{}", date.format("%Y-%m-%d"))
    }
}
