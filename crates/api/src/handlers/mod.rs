pub mod auth;
pub mod badge;
pub mod meta_pages;
pub mod schedule;
