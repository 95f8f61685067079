//! Ensemble change notification infrastructure.
//!
//! - [`ChangeBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ChangeNotice`] -- "something changed in table X" signal.
//! - [`ChangeListener`] -- background service turning PostgreSQL
//!   `NOTIFY` messages into bus notices.

pub mod bus;
pub mod listener;

pub use bus::{ChangeBus, ChangeNotice};
pub use listener::{ChangeListener, EVENTS_CHANNEL};
