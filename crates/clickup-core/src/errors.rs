//! # Core Error Types
//!
//! Errors raised by the pure domain helpers. The server maps every variant
//! to a client error.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Should only contain alphanumeric characters and underscores, maximum 20 length")]
    InvalidName,

    #[error("Date should be today or greater, and less than one year.")]
    DateOutOfRange,

    #[error("Date should be today or greater")]
    DateInPast,

    #[error("Enter a valid color code. Example: #RRGGBB or #RGB")]
    InvalidColorCode,

    #[error("Short code must be exactly 3 letters or digits")]
    InvalidShortCode,

    // ========================================================================
    // Sequence Errors
    // ========================================================================
    #[error("Malformed custom id: {0}")]
    MalformedCustomId(String),

    #[error("Custom id sequence exhausted")]
    SequenceOverflow,

    // ========================================================================
    // Sprint Errors
    // ========================================================================
    #[error("Number of sprints must be between 1 and {0}")]
    InvalidSprintCount(u32),

    #[error("Sprint duration must be between 1 and {0} days")]
    InvalidSprintDuration(u32),

    #[error("Sprint dates overflow the calendar")]
    DateOverflow,

    // ========================================================================
    // Parsing Errors
    // ========================================================================
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Unknown {kind} value: {value}")]
    UnknownChoice { kind: &'static str, value: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
