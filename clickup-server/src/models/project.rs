//! Project, list, folder and sprint models

use chrono::{DateTime, Utc};
use clickup_core::SprintStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Joke {
    #[serde(rename = "_id")]
    pub id: String,
    pub joke: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub erp_id: i32,
    pub short_code: String,
    /// Media path, rendered as a URL by the API
    pub logo: String,
}

/// List as embedded in folders and projects
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskList {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub project: String,
}

impl TaskList {
    pub fn summary(&self) -> ListSummary {
        ListSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Folder {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub project: String,
    pub list: Vec<ListSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sprint {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub active: bool,
    pub status: SprintStatus,
    #[serde(skip)]
    pub project: String,
}

/// Project with its sprints, folders and the lists outside any folder
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub sprint: Vec<Sprint>,
    pub folders: Vec<Folder>,
    pub lists: Vec<ListSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIcon {
    #[serde(rename = "_id")]
    pub id: String,
    pub color_code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub updated_at: DateTime<Utc>,
}
