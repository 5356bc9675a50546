//! # Tracker Constants
//!
//! Fixed limits and formats shared by the server and the core helpers.

// ============================================================================
// Custom IDs
// ============================================================================

/// Length of a project short code, the prefix of every ticket custom id
pub const SHORT_CODE_LEN: usize = 3;

/// Zero-padded width of the ticket sequence number
pub const TICKET_SEQUENCE_WIDTH: usize = 5;

/// Separator between the ticket custom id and the allocation sequence
pub const ALLOCATION_SEPARATOR: char = '#';

// ============================================================================
// Sprints
// ============================================================================

/// Upper bound on sprints generated by a single request
pub const MAX_SPRINTS_PER_REQUEST: u32 = 52;

/// Upper bound on a sprint length, in working days
pub const MAX_SPRINT_DURATION_DAYS: u32 = 90;

/// Date format used inside generated sprint names
pub const SPRINT_DATE_FORMAT: &str = "%d-%m-%Y";

// ============================================================================
// Validation
// ============================================================================

/// Maximum length accepted by the name validator
pub const MAX_NAME_LEN: usize = 20;

/// How far into the future a scheduled date may lie
pub const MAX_SCHEDULE_AHEAD_DAYS: i64 = 365;

// ============================================================================
// Durations
// ============================================================================

pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Default allocation estimate and team member allocation
pub const DEFAULT_ALLOCATION_SECONDS: i64 = SECONDS_PER_HOUR;
