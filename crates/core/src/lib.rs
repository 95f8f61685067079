//! Ensemble domain core.
//!
//! Pure, I/O-free logic shared by the database, broker and API crates:
//! the error taxonomy, id/timestamp aliases, schedule aggregation, the badge
//! provisioning wizard and the meta page ownership gate.

pub mod badge;
pub mod error;
pub mod meta_page;
pub mod schedule;
pub mod types;
