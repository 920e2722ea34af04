//! `roster-push` — Web Push delivery for task reminders.
//!
//! # Overview
//!
//! [`transport::PushTransport`] is the seam between "what to send" and "how
//! it reaches a browser": the production implementation
//! ([`transport::WebPushTransport`]) speaks the Web Push protocol with VAPID
//! signing and aes128gcm payload encryption; tests swap in a mock.
//!
//! [`service::PushService`] fans a payload out to every subscription a user
//! has registered, waits for all attempts to settle, prunes subscriptions
//! whose endpoints reject delivery, and reports the counts. A failing device
//! never blocks a user's other devices, and a failing user never blocks
//! other users.

pub mod error;
pub mod service;
pub mod transport;

pub use error::{PushError, Result};
pub use service::{PushService, SendReport};
pub use transport::{PushTransport, WebPushTransport};
