//! Reference data loading
//!
//! Seeds are idempotent: rows are matched by name or title and only missing
//! ones are inserted. Team members are matched by the email of their user.

use anyhow::{Context, Result};
use clickup_core::validators::check_color_code;
use clickup_core::{StatusCategory, DEFAULT_ALLOCATION_SECONDS};
use serde::Deserialize;
use sqlx::Row;
use std::path::Path;
use tracing::info;

use super::PostgresManager;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub departments: Vec<String>,
    pub roles: Vec<RoleSeed>,
    pub skills: Vec<String>,
    pub educations: Vec<String>,
    pub priorities: Vec<String>,
    pub ticket_statuses: Vec<TicketStatusSeed>,
    pub project_icons: Vec<ProjectIconSeed>,
    pub jokes: Vec<String>,
    pub team_members: Vec<TeamMemberSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleSeed {
    pub name: String,
    pub department: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketStatusSeed {
    pub title: String,
    pub icon: String,
    pub color_info: String,
    #[serde(default)]
    pub position: i32,
    pub category: Option<StatusCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectIconSeed {
    pub color_code: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamMemberSeed {
    pub email: String,
    /// Whole hours available per day
    #[serde(default)]
    pub allocation_hours: Option<i64>,
    /// Short codes of the projects the member works on
    #[serde(default)]
    pub projects: Vec<String>,
}

/// Rows inserted by a seed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: u64,
    pub team_members: usize,
}

impl SeedData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed: Self = toml::from_str(&content).context("failed to parse seed file")?;
        seed.check()?;
        Ok(seed)
    }

    /// Check color codes and role departments before touching the database
    pub fn check(&self) -> Result<()> {
        for status in &self.ticket_statuses {
            check_color_code(&status.color_info)
                .with_context(|| format!("ticket status {}", status.title))?;
        }
        for icon in &self.project_icons {
            check_color_code(&icon.color_code)
                .with_context(|| format!("project icon {}", icon.kind))?;
        }
        for role in &self.roles {
            if !self.departments.contains(&role.department) {
                anyhow::bail!(
                    "role {} references unknown department {}",
                    role.name,
                    role.department
                );
            }
        }
        Ok(())
    }
}

/// Insert `name` into a single-column lookup table unless present
const INSERT_NAMED: &str = "INSERT INTO {table} (id, {column}) \
     SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {column} = $2)";

fn insert_named(table: &str, column: &str) -> String {
    INSERT_NAMED.replace("{table}", table).replace("{column}", column)
}

impl PostgresManager {
    /// Load reference data in one transaction
    pub async fn seed(&self, seed: &SeedData) -> Result<SeedReport> {
        let mut tx = self.begin().await?;
        let mut report = SeedReport::default();

        let named: [(&str, &str, &[String]); 5] = [
            ("departments", "name", &seed.departments),
            ("skills", "name", &seed.skills),
            ("educations", "name", &seed.educations),
            ("priorities", "title", &seed.priorities),
            ("jokes", "joke", &seed.jokes),
        ];
        for (table, column, values) in named {
            let query = insert_named(table, column);
            for value in values {
                report.inserted += sqlx::query(&query)
                    .bind(clickup_core::generate_id())
                    .bind(value)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
            }
        }

        for role in &seed.roles {
            report.inserted += sqlx::query(
                "INSERT INTO roles (id, name, department_id) \
                 SELECT $1, $2, d.id FROM departments d WHERE d.name = $3 \
                 ON CONFLICT (name, department_id) DO NOTHING",
            )
            .bind(clickup_core::generate_id())
            .bind(&role.name)
            .bind(&role.department)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for status in &seed.ticket_statuses {
            report.inserted += sqlx::query(
                "INSERT INTO ticket_statuses (id, title, icon, color_info, position, category) \
                 VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (title) DO NOTHING",
            )
            .bind(clickup_core::generate_id())
            .bind(&status.title)
            .bind(&status.icon)
            .bind(&status.color_info)
            .bind(status.position)
            .bind(status.category.map(|c| c.as_str()))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for icon in &seed.project_icons {
            report.inserted += sqlx::query(
                "INSERT INTO project_icons (id, color_code, type) SELECT $1, $2, $3 \
                 WHERE NOT EXISTS (SELECT 1 FROM project_icons WHERE color_code = $2 AND type = $3)",
            )
            .bind(clickup_core::generate_id())
            .bind(&icon.color_code)
            .bind(&icon.kind)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;

        for member in &seed.team_members {
            self.seed_team_member(member).await?;
            report.team_members += 1;
        }

        info!(
            "Seed inserted {} rows and {} team members",
            report.inserted, report.team_members
        );
        Ok(report)
    }

    async fn seed_team_member(&self, member: &TeamMemberSeed) -> Result<()> {
        let user = self
            .get_user_by_email(&member.email)
            .await?
            .with_context(|| format!("no user with email {}", member.email))?;
        let employee = self.get_or_create_employee(&user.id).await?;

        let project_ids: Vec<String> =
            sqlx::query("SELECT id FROM projects WHERE short_code = ANY($1)")
                .bind(&member.projects)
                .fetch_all(&self.pool)
                .await?
                .iter()
                .map(|row| row.try_get("id"))
                .collect::<Result<_, _>>()?;
        if project_ids.len() < member.projects.len() {
            anyhow::bail!(
                "team member {} references unknown projects {:?}",
                member.email,
                member.projects
            );
        }

        let seconds = member
            .allocation_hours
            .map(|hours| hours * clickup_core::SECONDS_PER_HOUR)
            .unwrap_or(DEFAULT_ALLOCATION_SECONDS);
        self.upsert_team_member(&employee.id, seconds, &project_ids).await?;
        Ok(())
    }
}
