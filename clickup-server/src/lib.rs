//! ClickUp-style tracker server
//!
//! HTTP API over PostgreSQL for projects, sprints, people and tickets. The
//! binary in `main.rs` wires these modules together; integration tests use
//! the library directly.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod media;
pub mod metrics;
pub mod models;
pub mod services;

pub use api::{create_router, ApiState};
pub use config::ServerConfig;
pub use error::{TrackerError, TrackerResult};
