//! # ClickUp Core - Shared Tracker Logic
//!
//! This crate contains the pure domain logic of the tracker backend. It
//! provides:
//!
//! - Entity identifiers and the ticket/allocation custom-ID sequences
//! - Sprint planning (weekend-skipping date arithmetic)
//! - Field validators shared by every request payload
//! - Duration strings in the format the API exchanges
//! - Choice enums stored as plain text columns
//!
//! ## Feature Flags
//!
//! - `serde`: Enables serde support for choice enums and the duration adapter

pub mod constants;
pub mod duration;
pub mod errors;
pub mod ids;
pub mod sprint;
pub mod types;
pub mod validators;

// Re-export commonly used items
pub use constants::*;
pub use errors::{CoreError, CoreResult};
pub use ids::{generate_id, AllocationCustomId, TicketCustomId};
pub use sprint::{plan_sprints, sprint_end_date, SprintWindow};
pub use types::*;
