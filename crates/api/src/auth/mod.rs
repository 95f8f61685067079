//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation for anonymous
//!   identities.

pub mod jwt;
