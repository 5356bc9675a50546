//! # Identifiers
//!
//! Primary keys are 32-character hex UUIDs. Tickets and allocations also
//! carry a human-facing custom id:
//!
//! - ticket: `{short_code}{sequence:05}`, e.g. `ABC00042`
//! - allocation: `{ticket_custom_id}#{sequence}`, e.g. `ABC00042#3`
//!
//! The ticket sequence is one counter shared by every project, the project
//! only contributes the prefix. Allocation sequences restart for each ticket.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::constants::{ALLOCATION_SEPARATOR, SHORT_CODE_LEN, TICKET_SEQUENCE_WIDTH};
use crate::errors::{CoreError, CoreResult};
use crate::validators::check_short_code;

/// Generate a new primary key
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Ticket custom id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketCustomId {
    short_code: String,
    sequence: u32,
}

impl TicketCustomId {
    pub fn new(short_code: &str, sequence: u32) -> CoreResult<Self> {
        check_short_code(short_code)?;
        Ok(Self {
            short_code: short_code.to_string(),
            sequence,
        })
    }

    pub fn short_code(&self) -> &str {
        &self.short_code
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for TicketCustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            self.short_code,
            self.sequence,
            width = TICKET_SEQUENCE_WIDTH
        )
    }
}

impl FromStr for TicketCustomId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let malformed = || CoreError::MalformedCustomId(s.to_string());

        let split = s
            .char_indices()
            .nth(SHORT_CODE_LEN)
            .map(|(idx, _)| idx)
            .ok_or_else(malformed)?;
        let (code, digits) = s.split_at(split);

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let sequence = digits.parse::<u32>().map_err(|_| malformed())?;

        Self::new(code, sequence).map_err(|_| malformed())
    }
}

/// Allocation custom id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllocationCustomId {
    ticket: String,
    sequence: u32,
}

impl AllocationCustomId {
    pub fn new(ticket: impl Into<String>, sequence: u32) -> Self {
        Self {
            ticket: ticket.into(),
            sequence,
        }
    }

    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for AllocationCustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.ticket, ALLOCATION_SEPARATOR, self.sequence)
    }
}

impl FromStr for AllocationCustomId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let malformed = || CoreError::MalformedCustomId(s.to_string());

        let (ticket, sequence) = s.rsplit_once(ALLOCATION_SEPARATOR).ok_or_else(malformed)?;
        if ticket.is_empty() || sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let sequence = sequence.parse::<u32>().map_err(|_| malformed())?;

        Ok(Self::new(ticket, sequence))
    }
}

/// Next ticket custom id after `last_sequence` (the highest sequence issued
/// so far, across all projects)
pub fn next_ticket_custom_id(
    short_code: &str,
    last_sequence: Option<u32>,
) -> CoreResult<TicketCustomId> {
    let sequence = next_sequence(last_sequence)?;
    TicketCustomId::new(short_code, sequence)
}

/// Next allocation custom id for the ticket `ticket_custom_id`
pub fn next_allocation_custom_id(
    ticket_custom_id: &str,
    last_sequence: Option<u32>,
) -> CoreResult<AllocationCustomId> {
    if ticket_custom_id.is_empty() {
        return Err(CoreError::MalformedCustomId(ticket_custom_id.to_string()));
    }
    let sequence = next_sequence(last_sequence)?;
    Ok(AllocationCustomId::new(ticket_custom_id, sequence))
}

fn next_sequence(last: Option<u32>) -> CoreResult<u32> {
    match last {
        Some(last) => last.checked_add(1).ok_or(CoreError::SequenceOverflow),
        None => Ok(1),
    }
}

/// Highest sequence among well-formed ids, ignoring anything unparsable
pub fn highest_sequence<T, I>(ids: I) -> Option<u32>
where
    T: FromStr + Sequenced,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    ids.into_iter()
        .filter_map(|id| id.as_ref().parse::<T>().ok())
        .map(|id| id.sequence_number())
        .max()
}

/// Custom ids that carry a sequence number
pub trait Sequenced {
    fn sequence_number(&self) -> u32;
}

impl Sequenced for TicketCustomId {
    fn sequence_number(&self) -> u32 {
        self.sequence
    }
}

impl Sequenced for AllocationCustomId {
    fn sequence_number(&self) -> u32 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_32_hex_chars() {
        let id = generate_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, generate_id());
    }

    #[test]
    fn first_ticket_starts_at_one() {
        let id = next_ticket_custom_id("ABC", None).unwrap();
        assert_eq!(id.to_string(), "ABC00001");
    }

    #[test]
    fn ticket_sequence_continues_from_last() {
        let id = next_ticket_custom_id("XYZ", Some(41)).unwrap();
        assert_eq!(id.to_string(), "XYZ00042");
    }

    #[test]
    fn ticket_sequence_widens_past_five_digits() {
        let id = next_ticket_custom_id("ABC", Some(99_999)).unwrap();
        assert_eq!(id.to_string(), "ABC100000");
        assert_eq!("ABC100000".parse::<TicketCustomId>().unwrap().sequence(), 100_000);
    }

    #[test]
    fn ticket_id_rejects_bad_short_code() {
        assert!(next_ticket_custom_id("AB", None).is_err());
        assert!(next_ticket_custom_id("AB-", None).is_err());
    }

    #[test]
    fn parses_ticket_ids() {
        let id: TicketCustomId = "PRJ00017".parse().unwrap();
        assert_eq!(id.short_code(), "PRJ");
        assert_eq!(id.sequence(), 17);

        assert!("PRJ".parse::<TicketCustomId>().is_err());
        assert!("PRJ00a17".parse::<TicketCustomId>().is_err());
        assert!("PRJ+0017".parse::<TicketCustomId>().is_err());
    }

    #[test]
    fn allocation_ids_follow_ticket() {
        let first = next_allocation_custom_id("ABC00003", None).unwrap();
        assert_eq!(first.to_string(), "ABC00003#1");

        let next = next_allocation_custom_id("ABC00003", Some(4)).unwrap();
        assert_eq!(next.to_string(), "ABC00003#5");
    }

    #[test]
    fn parses_allocation_ids_at_last_separator() {
        let id: AllocationCustomId = "ABC00003#12".parse().unwrap();
        assert_eq!(id.ticket(), "ABC00003");
        assert_eq!(id.sequence(), 12);

        assert!("ABC00003".parse::<AllocationCustomId>().is_err());
        assert!("ABC00003#".parse::<AllocationCustomId>().is_err());
        assert!("#4".parse::<AllocationCustomId>().is_err());
    }

    #[test]
    fn highest_sequence_skips_malformed() {
        let ids = ["ABC00003#2", "garbage", "ABC00003#10", "ABC00003#x"];
        assert_eq!(highest_sequence::<AllocationCustomId, _>(ids), Some(10));

        let tickets = ["ABC00002", "XYZ00009", "bad"];
        assert_eq!(highest_sequence::<TicketCustomId, _>(tickets), Some(9));

        assert_eq!(highest_sequence::<TicketCustomId, _>(Vec::<&str>::new()), None);
    }

    #[test]
    fn sequence_overflow_is_an_error() {
        assert_eq!(
            next_allocation_custom_id("ABC00001", Some(u32::MAX)),
            Err(CoreError::SequenceOverflow)
        );
    }
}
