//! HTTP endpoints — one module per route, thin handlers throughout:
//! auth first, validate, delegate, map errors to status codes.

use serde::Serialize;

pub mod daily;
pub mod health;
pub mod send;
pub mod spawn;
pub mod subscriptions;

/// Error body shared by every endpoint.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }

    /// Standard 401 body for the shared-secret endpoints.
    pub fn unauthorized() -> Self {
        Self::new("Unauthorized. Set 'Authorization: Bearer <cron-secret>' header.")
    }
}
