//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Where the API exposes writes, a `Deserialize` update DTO

pub mod event;
pub mod meta_page;
pub mod room;
pub mod track;
pub mod user;
