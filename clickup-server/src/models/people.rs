//! Department, role, employee and team member models

use chrono::{DateTime, Utc};
use clickup_core::{DateFormat, ThemeMode, TimeFormat, ToastPosition};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Department {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub department: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub employee_id: String,
    /// Media path, rendered as a URL by the API
    pub photo: Option<String>,
    pub role: Option<String>,
    pub skill_set: Vec<String>,
    pub theme: ThemeMode,
    pub date_format: DateFormat,
    pub time_format: TimeFormat,
    pub toast_position: ToastPosition,
    pub contact_number: String,
    pub education: Vec<String>,
}

impl Employee {
    /// Blank profile for a user signing in for the first time
    pub fn for_user(id: String, user: &str) -> Self {
        Self {
            id,
            user: user.to_string(),
            employee_id: String::new(),
            photo: None,
            role: None,
            skill_set: Vec::new(),
            theme: ThemeMode::default(),
            date_format: DateFormat::default(),
            time_format: TimeFormat::default(),
            toast_position: ToastPosition::default(),
            contact_number: String::new(),
            education: Vec::new(),
        }
    }
}

/// Team member as listed in the allocation overview and on allocations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub role: Option<String>,
    pub user: String,
    pub employee_name: String,
    pub photo: Option<String>,
    pub allocation_hours: i64,
    pub department: Option<String>,
    pub role_name: Option<String>,
    pub total_tickets: i64,
    pub todo: i64,
    pub inprogress: i64,
    pub completed: i64,
    #[serde(rename = "readyforQA")]
    pub ready_for_qa: i64,
    pub tickets_first_approved: i64,
    pub rejection_count: i64,
    pub last_worked: Option<DateTime<Utc>>,
    pub performance_index: i32,
    pub quality_index: i32,
}

/// `allocatedUsers` payload of the team member endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedUsers {
    pub project_aggregation: Vec<TeamMemberView>,
    pub total_allocated_users: usize,
}

impl AllocatedUsers {
    pub fn new(members: Vec<TeamMemberView>) -> Self {
        Self {
            total_allocated_users: members.len(),
            project_aggregation: members,
        }
    }
}

/// Employee reference embedded in audit fields
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_name: String,
    pub photo: Option<String>,
}
