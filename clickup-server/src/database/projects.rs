//! Project, list, folder, sprint, icon and joke queries

use chrono::NaiveDate;
use clickup_core::sprint::{last_sprint_number, plan_sprints};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use tracing::info;

use super::postgres::choice;
use super::PostgresManager;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{
    Folder, Joke, ListSummary, Project, ProjectDetail, ProjectIcon, Sprint, TaskList,
};

fn project_from_row(row: &PgRow) -> Result<Project, sqlx::Error> {
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        erp_id: row.try_get("erp_id")?,
        short_code: row.try_get("short_code")?,
        logo: row.try_get("logo")?,
    })
}

fn list_from_row(row: &PgRow) -> Result<TaskList, sqlx::Error> {
    Ok(TaskList {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        project: row.try_get("project_id")?,
    })
}

fn sprint_from_row(row: &PgRow) -> Result<Sprint, sqlx::Error> {
    Ok(Sprint {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        active: row.try_get("active")?,
        status: choice(row, "status")?,
        project: row.try_get("project_id")?,
    })
}

impl PostgresManager {
    // Projects

    pub async fn list_projects(&self, limit: i64, offset: i64) -> TrackerResult<Vec<Project>> {
        let rows = sqlx::query(
            "SELECT id, name, erp_id, short_code, logo FROM projects \
             ORDER BY created_at, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(project_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn count_projects(&self) -> TrackerResult<i64> {
        Ok(self.count("projects").await?)
    }

    pub async fn get_project(&self, id: &str) -> TrackerResult<Option<Project>> {
        let row = sqlx::query("SELECT id, name, erp_id, short_code, logo FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(project_from_row).transpose()?)
    }

    pub async fn insert_project(&self, project: &Project) -> TrackerResult<()> {
        sqlx::query(
            "INSERT INTO projects (id, name, erp_id, short_code, logo) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(project.erp_id)
        .bind(&project.short_code)
        .bind(&project.logo)
        .execute(&self.pool)
        .await?;
        info!("Created project {} ({})", project.name, project.short_code);
        Ok(())
    }

    pub async fn update_project(&self, project: &Project) -> TrackerResult<()> {
        sqlx::query(
            "UPDATE projects SET name = $2, erp_id = $3, short_code = $4, logo = $5 WHERE id = $1",
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(project.erp_id)
        .bind(&project.short_code)
        .bind(&project.logo)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_project(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("projects", id).await?)
    }

    /// Attach sprints, folders and unfiled lists to each project
    pub async fn project_details(&self, projects: Vec<Project>) -> TrackerResult<Vec<ProjectDetail>> {
        let ids: Vec<String> = projects.iter().map(|p| p.id.clone()).collect();

        let mut sprints: HashMap<String, Vec<Sprint>> = HashMap::new();
        for sprint in self.sprints_for_projects(&ids).await? {
            sprints.entry(sprint.project.clone()).or_default().push(sprint);
        }

        let mut folders: HashMap<String, Vec<Folder>> = HashMap::new();
        for folder in self.folders_for_projects(&ids).await? {
            folders.entry(folder.project.clone()).or_default().push(folder);
        }

        let rows = sqlx::query(
            "SELECT l.id, l.name, l.project_id FROM lists l \
             WHERE l.project_id = ANY($1) \
               AND NOT EXISTS (SELECT 1 FROM folder_lists fl WHERE fl.list_id = l.id) \
             ORDER BY l.created_at, l.id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut lists: HashMap<String, Vec<ListSummary>> = HashMap::new();
        for row in &rows {
            let list = list_from_row(row)?;
            lists.entry(list.project.clone()).or_default().push(list.summary());
        }

        Ok(projects
            .into_iter()
            .map(|project| ProjectDetail {
                sprint: sprints.remove(&project.id).unwrap_or_default(),
                folders: folders.remove(&project.id).unwrap_or_default(),
                lists: lists.remove(&project.id).unwrap_or_default(),
                project,
            })
            .collect())
    }

    // Lists

    pub async fn list_lists(&self, limit: i64, offset: i64) -> TrackerResult<Vec<TaskList>> {
        let rows = sqlx::query(
            "SELECT id, name, project_id FROM lists ORDER BY created_at, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(list_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn count_lists(&self) -> TrackerResult<i64> {
        Ok(self.count("lists").await?)
    }

    pub async fn get_list(&self, id: &str) -> TrackerResult<Option<TaskList>> {
        let row = sqlx::query("SELECT id, name, project_id FROM lists WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(list_from_row).transpose()?)
    }

    pub async fn insert_list(&self, list: &TaskList) -> TrackerResult<()> {
        sqlx::query("INSERT INTO lists (id, name, project_id) VALUES ($1, $2, $3)")
            .bind(&list.id)
            .bind(&list.name)
            .bind(&list.project)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_list(&self, list: &TaskList) -> TrackerResult<()> {
        sqlx::query("UPDATE lists SET name = $2, project_id = $3 WHERE id = $1")
            .bind(&list.id)
            .bind(&list.name)
            .bind(&list.project)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_list(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("lists", id).await?)
    }

    /// Ids among `list_ids` that are not lists of `project_id`
    pub async fn foreign_lists(&self, project_id: &str, list_ids: &[String]) -> TrackerResult<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM lists WHERE id = ANY($1) AND project_id = $2")
            .bind(list_ids)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        let known: Vec<String> = rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<_, _>>()?;
        Ok(list_ids
            .iter()
            .filter(|id| !known.contains(id))
            .cloned()
            .collect())
    }

    // Folders

    async fn attach_folder_lists(&self, rows: Vec<PgRow>) -> TrackerResult<Vec<Folder>> {
        let mut folders = Vec::with_capacity(rows.len());
        for row in &rows {
            folders.push(Folder {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                project: row.try_get("project_id")?,
                list: Vec::new(),
            });
        }
        let ids: Vec<String> = folders.iter().map(|f| f.id.clone()).collect();
        let list_rows = sqlx::query(
            "SELECT fl.folder_id, l.id, l.name FROM folder_lists fl \
             JOIN lists l ON l.id = fl.list_id \
             WHERE fl.folder_id = ANY($1) ORDER BY l.created_at, l.id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_folder: HashMap<String, Vec<ListSummary>> = HashMap::new();
        for row in &list_rows {
            let folder_id: String = row.try_get("folder_id")?;
            by_folder.entry(folder_id).or_default().push(ListSummary {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            });
        }
        for folder in &mut folders {
            folder.list = by_folder.remove(&folder.id).unwrap_or_default();
        }
        Ok(folders)
    }

    async fn folders_for_projects(&self, project_ids: &[String]) -> TrackerResult<Vec<Folder>> {
        let rows = sqlx::query(
            "SELECT id, name, project_id FROM folders WHERE project_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(project_ids)
        .fetch_all(&self.pool)
        .await?;
        self.attach_folder_lists(rows).await
    }

    pub async fn list_folders(&self, limit: i64, offset: i64) -> TrackerResult<Vec<Folder>> {
        let rows = sqlx::query(
            "SELECT id, name, project_id FROM folders ORDER BY created_at, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        self.attach_folder_lists(rows).await
    }

    pub async fn count_folders(&self) -> TrackerResult<i64> {
        Ok(self.count("folders").await?)
    }

    pub async fn get_folder(&self, id: &str) -> TrackerResult<Option<Folder>> {
        let rows = sqlx::query("SELECT id, name, project_id FROM folders WHERE id = $1")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(self.attach_folder_lists(rows).await?.pop())
    }

    /// Create or update a folder and replace its list membership
    pub async fn save_folder(
        &self,
        id: &str,
        name: &str,
        project_id: &str,
        list_ids: Option<&[String]>,
    ) -> TrackerResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO folders (id, name, project_id) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, project_id = EXCLUDED.project_id",
        )
        .bind(id)
        .bind(name)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

        if let Some(list_ids) = list_ids {
            sqlx::query("DELETE FROM folder_lists WHERE folder_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO folder_lists (folder_id, list_id) \
                 SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(list_ids)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Create a folder together with one new list per name
    pub async fn create_folder_with_lists(
        &self,
        name: &str,
        project_id: &str,
        list_names: &[String],
    ) -> TrackerResult<Folder> {
        let folder_id = clickup_core::generate_id();
        let mut tx = self.begin().await?;
        sqlx::query("INSERT INTO folders (id, name, project_id) VALUES ($1, $2, $3)")
            .bind(&folder_id)
            .bind(name)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        let mut lists = Vec::with_capacity(list_names.len());
        for list_name in list_names {
            let list_id = clickup_core::generate_id();
            sqlx::query(
                "INSERT INTO lists (id, name, project_id, created_at) VALUES ($1, $2, $3, clock_timestamp())",
            )
            .bind(&list_id)
            .bind(list_name)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query("INSERT INTO folder_lists (folder_id, list_id) VALUES ($1, $2)")
                .bind(&folder_id)
                .bind(&list_id)
                .execute(&mut *tx)
                .await?;
            lists.push(ListSummary {
                id: list_id,
                name: list_name.clone(),
            });
        }
        tx.commit().await?;

        Ok(Folder {
            id: folder_id,
            name: name.to_string(),
            project: project_id.to_string(),
            list: lists,
        })
    }

    pub async fn delete_folder(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("folders", id).await?)
    }

    // Sprints

    async fn sprints_for_projects(&self, project_ids: &[String]) -> TrackerResult<Vec<Sprint>> {
        let rows = sqlx::query(
            "SELECT id, name, active, status, project_id FROM sprints \
             WHERE project_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(project_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(sprint_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn list_sprints(&self, limit: i64, offset: i64) -> TrackerResult<Vec<Sprint>> {
        let rows = sqlx::query(
            "SELECT id, name, active, status, project_id FROM sprints \
             ORDER BY created_at, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(sprint_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn count_sprints(&self) -> TrackerResult<i64> {
        Ok(self.count("sprints").await?)
    }

    pub async fn get_sprint(&self, id: &str) -> TrackerResult<Option<Sprint>> {
        let row = sqlx::query("SELECT id, name, active, status, project_id FROM sprints WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(sprint_from_row).transpose()?)
    }

    /// Plan and insert `count` sprints continuing the project's numbering
    ///
    /// The project row is locked for the duration so concurrent requests
    /// cannot reuse a sprint number.
    pub async fn create_sprints(
        &self,
        project_id: &str,
        start: NaiveDate,
        count: u32,
        duration_days: u32,
    ) -> TrackerResult<Vec<Sprint>> {
        let mut tx = self.begin().await?;
        let locked = sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(TrackerError::BadRequest("Project doesn't Exist.".to_string()));
        }

        let names: Vec<String> = sqlx::query("SELECT name FROM sprints WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.try_get("name"))
            .collect::<Result<_, _>>()?;

        let plan = plan_sprints(last_sprint_number(&names), start, count, duration_days)?;

        let mut created = Vec::with_capacity(plan.len());
        for window in &plan {
            let sprint = Sprint {
                id: clickup_core::generate_id(),
                name: window.name(),
                active: false,
                status: Default::default(),
                project: project_id.to_string(),
            };
            sqlx::query(
                "INSERT INTO sprints (id, name, active, status, project_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5, clock_timestamp())",
            )
            .bind(&sprint.id)
            .bind(&sprint.name)
            .bind(sprint.active)
            .bind(sprint.status.as_str())
            .bind(&sprint.project)
            .execute(&mut *tx)
            .await?;
            created.push(sprint);
        }
        tx.commit().await?;

        info!("Created {} sprints for project {}", created.len(), project_id);
        Ok(created)
    }

    pub async fn update_sprint(&self, sprint: &Sprint) -> TrackerResult<()> {
        sqlx::query("UPDATE sprints SET name = $2, active = $3, status = $4 WHERE id = $1")
            .bind(&sprint.id)
            .bind(&sprint.name)
            .bind(sprint.active)
            .bind(sprint.status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_sprint(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("sprints", id).await?)
    }

    // Reference data

    pub async fn list_project_icons(&self) -> TrackerResult<Vec<ProjectIcon>> {
        let rows = sqlx::query(
            "SELECT id, color_code, type, updated_at FROM project_icons ORDER BY updated_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> TrackerResult<ProjectIcon> {
                Ok(ProjectIcon {
                    id: row.try_get("id")?,
                    color_code: row.try_get("color_code")?,
                    kind: row.try_get("type")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    pub async fn random_joke(&self) -> TrackerResult<Option<Joke>> {
        let row = sqlx::query("SELECT id, joke FROM jokes ORDER BY random() LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(Joke {
                id: row.try_get("id")?,
                joke: row.try_get("joke")?,
            })),
            None => Ok(None),
        }
    }
}
