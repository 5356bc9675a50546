//! Ticket, allocation and attachment models

use chrono::{DateTime, NaiveDate, Utc};
use clickup_core::StatusCategory;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{EmployeeRef, TeamMemberView};

#[derive(Debug, Clone, serde::Serialize)]
pub struct Priority {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStatus {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub icon: String,
    pub color_info: String,
    pub position: i32,
    pub category: Option<StatusCategory>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub custom_id: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<String>,
    pub list: Option<String>,
    pub sprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Vec<String>,
    pub updated_by: Vec<String>,
    pub deleted_by: Vec<String>,
    pub allocations: Vec<TicketAllocation>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketAllocation {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub priority: Option<String>,
    pub ticket_status: Option<String>,
    pub custom_id: String,
    #[serde(with = "clickup_core::duration::hms")]
    pub estimation_hours: i64,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assigned_users: Vec<TeamMemberView>,
    pub ticket: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Vec<EmployeeRef>,
    pub updated_by: Vec<EmployeeRef>,
    pub deleted_by: Vec<EmployeeRef>,
    #[serde(rename = "_v")]
    pub version: i32,
}

/// One board column: the tickets with allocations in a status
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub group_by_id: String,
    pub data: Vec<Ticket>,
}

/// Which record an attachment hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentOwner {
    Ticket,
    Allocation,
}

impl AttachmentOwner {
    pub fn table(&self) -> &'static str {
        match self {
            AttachmentOwner::Ticket => "ticket_attachments",
            AttachmentOwner::Allocation => "ticket_allocation_attachments",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            AttachmentOwner::Ticket => "ticket_id",
            AttachmentOwner::Allocation => "allocation_id",
        }
    }

    /// Key of the owner id in the response body
    pub fn field(&self) -> &'static str {
        match self {
            AttachmentOwner::Ticket => "ticket",
            AttachmentOwner::Allocation => "ticketAllocation",
        }
    }

    /// Media directory uploads land in
    pub fn media_dir(&self) -> &'static str {
        match self {
            AttachmentOwner::Ticket => "ticket/attachment",
            AttachmentOwner::Allocation => "ticket-allocation/attachment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttachmentOwner::Ticket => "Ticket",
            AttachmentOwner::Allocation => "Ticket allocation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub owner: AttachmentOwner,
    pub owner_id: String,
    pub kind: String,
    /// Media path, rendered as a URL by the API
    pub files: String,
}

impl Serialize for Attachment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("_id", &self.id)?;
        map.serialize_entry("type", &self.kind)?;
        map.serialize_entry(self.owner.field(), &self.owner_id)?;
        map.serialize_entry("files", &self.files)?;
        map.end()
    }
}
