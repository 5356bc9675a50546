//! Business operations spanning several queries

pub mod accounts;
pub mod board;
pub mod sign_in;
pub mod sprints;

pub use accounts::AccountService;
pub use board::{group_by_status, BoardPage};
pub use sign_in::{SignInService, SignedIn};
pub use sprints::SprintPlanRequest;
