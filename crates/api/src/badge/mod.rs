//! Server-side badge provisioning sessions.
//!
//! Each open wizard owns one [`BadgeSession`](ensemble_core::badge::BadgeSession)
//! plus one broker link. [`BadgeSessionManager`] keeps them keyed by session
//! id and releases the link whenever a session ends.

pub mod manager;

pub use manager::{BadgeSessionError, BadgeSessionManager, BadgeSessionView};
