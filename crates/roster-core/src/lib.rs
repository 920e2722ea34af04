//! `roster-core` — shared configuration, error and domain types for the
//! roster task-reminder service.
//!
//! Everything here is plain data: no I/O, no async. The stores
//! (`roster-store`), the push delivery layer (`roster-push`) and the HTTP
//! gateway (`roster-gateway`) all build on these types.

pub mod config;
pub mod error;
pub mod types;

pub use config::RosterConfig;
pub use error::{Result, RosterError};
