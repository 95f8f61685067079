//! Repository structs: one per table, each a namespace of async query
//! functions taking a `&PgPool`.

pub mod event_repo;
pub mod meta_page_repo;
pub mod room_repo;
pub mod track_repo;
pub mod user_repo;

pub use event_repo::EventRepo;
pub use meta_page_repo::{MetaPageRepo, SaveOutcome};
pub use room_repo::RoomRepo;
pub use track_repo::TrackRepo;
pub use user_repo::UserRepo;
