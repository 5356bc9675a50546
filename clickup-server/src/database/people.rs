//! Role, employee and team member queries

use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;

use super::postgres::choice;
use super::PostgresManager;
use crate::error::TrackerResult;
use crate::models::{full_name, Employee, EmployeeRef, Role, TeamMemberView};

const EMPLOYEE_COLUMNS: &str = "id, user_id, employee_id, photo, role_id, theme, date_format, \
     time_format, toast_position, contact_number";

const TEAM_MEMBER_QUERY: &str = r#"
    SELECT tm.id, tm.employee_id, tm.allocation_seconds, tm.last_worked,
           tm.performance_index, tm.quality_index,
           e.photo, e.role_id, r.name AS role_name, d.name AS department_name,
           u.first_name, u.last_name,
           stats.total, stats.todo, stats.inprogress, stats.readyforqa, stats.completed
    FROM team_members tm
    JOIN employees e ON e.id = tm.employee_id
    JOIN users u ON u.id = e.user_id
    LEFT JOIN roles r ON r.id = e.role_id
    LEFT JOIN departments d ON d.id = r.department_id
    CROSS JOIN LATERAL (
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE s.category = 'todo') AS todo,
               COUNT(*) FILTER (WHERE s.category = 'inprogress') AS inprogress,
               COUNT(*) FILTER (WHERE s.category = 'readyforqa') AS readyforqa,
               COUNT(*) FILTER (WHERE s.category = 'completed') AS completed
        FROM ticket_allocation_assignees a
        JOIN ticket_allocations ta ON ta.id = a.allocation_id
        LEFT JOIN ticket_statuses s ON s.id = ta.ticket_status_id
        WHERE a.team_member_id = tm.id
    ) stats
    WHERE ($1::text IS NULL OR EXISTS (
              SELECT 1 FROM team_member_projects p
              WHERE p.team_member_id = tm.id AND p.project_id = $1))
      AND ($2::text[] IS NULL OR tm.id = ANY($2))
    ORDER BY u.first_name, u.last_name, tm.id
"#;

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        department: row.try_get("department_id")?,
    })
}

fn employee_from_row(row: &PgRow) -> Result<Employee, sqlx::Error> {
    Ok(Employee {
        id: row.try_get("id")?,
        user: row.try_get("user_id")?,
        employee_id: row.try_get("employee_id")?,
        photo: row.try_get("photo")?,
        role: row.try_get("role_id")?,
        skill_set: Vec::new(),
        theme: choice(row, "theme")?,
        date_format: choice(row, "date_format")?,
        time_format: choice(row, "time_format")?,
        toast_position: choice(row, "toast_position")?,
        contact_number: row.try_get("contact_number")?,
        education: Vec::new(),
    })
}

fn team_member_from_row(row: &PgRow) -> Result<TeamMemberView, sqlx::Error> {
    let first: String = row.try_get("first_name")?;
    let last: String = row.try_get("last_name")?;
    let name = full_name(&first, &last);
    let allocation_seconds: i64 = row.try_get("allocation_seconds")?;
    Ok(TeamMemberView {
        id: row.try_get("id")?,
        user_id: row.try_get("employee_id")?,
        role: row.try_get("role_id")?,
        user: name.clone(),
        employee_name: name,
        photo: row.try_get("photo")?,
        allocation_hours: clickup_core::duration::whole_hours(allocation_seconds),
        department: row.try_get("department_name")?,
        role_name: row.try_get("role_name")?,
        total_tickets: row.try_get("total")?,
        todo: row.try_get("todo")?,
        inprogress: row.try_get("inprogress")?,
        completed: row.try_get("completed")?,
        ready_for_qa: row.try_get("readyforqa")?,
        tickets_first_approved: 0,
        rejection_count: 0,
        last_worked: row.try_get("last_worked")?,
        performance_index: row.try_get("performance_index")?,
        quality_index: row.try_get("quality_index")?,
    })
}

impl PostgresManager {
    // Roles

    pub async fn list_roles(&self, limit: i64, offset: i64) -> TrackerResult<Vec<Role>> {
        let rows = sqlx::query(
            "SELECT id, name, department_id FROM roles ORDER BY name, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(role_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn count_roles(&self) -> TrackerResult<i64> {
        Ok(self.count("roles").await?)
    }

    pub async fn get_role(&self, id: &str) -> TrackerResult<Option<Role>> {
        let row = sqlx::query("SELECT id, name, department_id FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(role_from_row).transpose()?)
    }

    pub async fn save_role(&self, role: &Role) -> TrackerResult<()> {
        sqlx::query(
            "INSERT INTO roles (id, name, department_id) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, department_id = EXCLUDED.department_id",
        )
        .bind(&role.id)
        .bind(&role.name)
        .bind(&role.department)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_role(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("roles", id).await?)
    }

    pub async fn department_exists(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.exists("departments", id).await?)
    }

    // Employees

    async fn attach_employee_relations(&self, mut employees: Vec<Employee>) -> TrackerResult<Vec<Employee>> {
        let ids: Vec<String> = employees.iter().map(|e| e.id.clone()).collect();

        let skill_rows = sqlx::query(
            "SELECT employee_id, skill_id FROM employee_skills WHERE employee_id = ANY($1) ORDER BY skill_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let education_rows = sqlx::query(
            "SELECT employee_id, education_id FROM employee_educations WHERE employee_id = ANY($1) ORDER BY education_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut skills: HashMap<String, Vec<String>> = HashMap::new();
        for row in &skill_rows {
            let employee: String = row.try_get("employee_id")?;
            skills.entry(employee).or_default().push(row.try_get("skill_id")?);
        }
        let mut educations: HashMap<String, Vec<String>> = HashMap::new();
        for row in &education_rows {
            let employee: String = row.try_get("employee_id")?;
            educations.entry(employee).or_default().push(row.try_get("education_id")?);
        }

        for employee in &mut employees {
            employee.skill_set = skills.remove(&employee.id).unwrap_or_default();
            employee.education = educations.remove(&employee.id).unwrap_or_default();
        }
        Ok(employees)
    }

    pub async fn list_employees(&self, limit: i64, offset: i64) -> TrackerResult<Vec<Employee>> {
        let query = format!(
            "SELECT {} FROM employees ORDER BY id LIMIT $1 OFFSET $2",
            EMPLOYEE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let employees: Vec<Employee> = rows
            .iter()
            .map(employee_from_row)
            .collect::<Result<_, _>>()?;
        self.attach_employee_relations(employees).await
    }

    pub async fn count_employees(&self) -> TrackerResult<i64> {
        Ok(self.count("employees").await?)
    }

    async fn find_employee(&self, column: &str, value: &str) -> TrackerResult<Option<Employee>> {
        let query = format!("SELECT {} FROM employees WHERE {} = $1", EMPLOYEE_COLUMNS, column);
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let employee = employee_from_row(&row)?;
                Ok(self.attach_employee_relations(vec![employee]).await?.pop())
            }
            None => Ok(None),
        }
    }

    pub async fn get_employee(&self, id: &str) -> TrackerResult<Option<Employee>> {
        self.find_employee("id", id).await
    }

    pub async fn get_employee_by_user(&self, user_id: &str) -> TrackerResult<Option<Employee>> {
        self.find_employee("user_id", user_id).await
    }

    /// Employee profile of a user, created blank when missing
    pub async fn get_or_create_employee(&self, user_id: &str) -> TrackerResult<Employee> {
        sqlx::query(
            "INSERT INTO employees (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(clickup_core::generate_id())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        self.get_employee_by_user(user_id)
            .await?
            .ok_or_else(|| crate::error::TrackerError::not_found("Employee"))
    }

    /// Insert or update an employee and replace its skills and education
    pub async fn save_employee(&self, employee: &Employee) -> TrackerResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO employees (id, user_id, employee_id, photo, role_id, theme, date_format, \
                                    time_format, toast_position, contact_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
                user_id = EXCLUDED.user_id, employee_id = EXCLUDED.employee_id, \
                photo = EXCLUDED.photo, role_id = EXCLUDED.role_id, theme = EXCLUDED.theme, \
                date_format = EXCLUDED.date_format, time_format = EXCLUDED.time_format, \
                toast_position = EXCLUDED.toast_position, contact_number = EXCLUDED.contact_number",
        )
        .bind(&employee.id)
        .bind(&employee.user)
        .bind(&employee.employee_id)
        .bind(&employee.photo)
        .bind(&employee.role)
        .bind(employee.theme.as_str())
        .bind(employee.date_format.as_str())
        .bind(employee.time_format.as_str())
        .bind(employee.toast_position.as_str())
        .bind(&employee.contact_number)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM employee_skills WHERE employee_id = $1")
            .bind(&employee.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO employee_skills (employee_id, skill_id) \
             SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(&employee.id)
        .bind(&employee.skill_set)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM employee_educations WHERE employee_id = $1")
            .bind(&employee.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO employee_educations (employee_id, education_id) \
             SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(&employee.id)
        .bind(&employee.education)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn set_employee_photo(&self, id: &str, photo: &str) -> TrackerResult<()> {
        sqlx::query("UPDATE employees SET photo = $2 WHERE id = $1")
            .bind(id)
            .bind(photo)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_employee(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("employees", id).await?)
    }

    /// Display references for audit fields, keyed by employee id
    pub async fn employee_refs(&self, ids: &[String]) -> TrackerResult<HashMap<String, EmployeeRef>> {
        let rows = sqlx::query(
            "SELECT e.id, e.photo, u.first_name, u.last_name FROM employees e \
             JOIN users u ON u.id = e.user_id WHERE e.id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut refs = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let first: String = row.try_get("first_name")?;
            let last: String = row.try_get("last_name")?;
            refs.insert(
                id.clone(),
                EmployeeRef {
                    id,
                    employee_name: full_name(&first, &last),
                    photo: row.try_get("photo")?,
                },
            );
        }
        Ok(refs)
    }

    // Team members

    /// Team members with their ticket counters, optionally limited to a project
    pub async fn team_members(&self, project_id: Option<&str>) -> TrackerResult<Vec<TeamMemberView>> {
        let rows = sqlx::query(TEAM_MEMBER_QUERY)
            .bind(project_id)
            .bind(None::<Vec<String>>)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(team_member_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn team_members_by_id(&self, ids: &[String]) -> TrackerResult<Vec<TeamMemberView>> {
        let rows = sqlx::query(TEAM_MEMBER_QUERY)
            .bind(None::<String>)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(team_member_from_row).collect::<Result<_, _>>()?)
    }

    /// Ids among `ids` that are not team members
    pub async fn unknown_team_members(&self, ids: &[String]) -> TrackerResult<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM team_members WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        let known: Vec<String> = rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<_, _>>()?;
        Ok(ids.iter().filter(|id| !known.contains(id)).cloned().collect())
    }

    /// Make an employee a team member of the given projects
    pub async fn upsert_team_member(
        &self,
        employee_id: &str,
        allocation_seconds: i64,
        project_ids: &[String],
    ) -> TrackerResult<String> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(
            "INSERT INTO team_members (id, employee_id, allocation_seconds) VALUES ($1, $2, $3) \
             ON CONFLICT (employee_id) DO UPDATE SET allocation_seconds = EXCLUDED.allocation_seconds \
             RETURNING id",
        )
        .bind(clickup_core::generate_id())
        .bind(employee_id)
        .bind(allocation_seconds)
        .fetch_one(&mut *tx)
        .await?;
        let id: String = row.try_get("id")?;

        sqlx::query(
            "INSERT INTO team_member_projects (team_member_id, project_id) \
             SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(&id)
        .bind(project_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(id)
    }
}
