//! Data models for the tracker entities
//!
//! Models serialize to the wire shape the API exposes: camelCase keys with
//! the primary key under `_id`.

pub mod people;
pub mod project;
pub mod ticket;
pub mod user;

pub use people::*;
pub use project::*;
pub use ticket::*;
pub use user::*;

/// Join first and last name the way they are displayed
pub fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first, last).trim().to_string()
}
