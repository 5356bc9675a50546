//! Priority, status, ticket, allocation and attachment queries

use chrono::NaiveDate;
use clickup_core::ids::{highest_sequence, next_allocation_custom_id, next_ticket_custom_id};
use clickup_core::{AllocationCustomId, CoreError};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::postgres::TICKET_SEQUENCE_LOCK;
use super::PostgresManager;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{
    Attachment, AttachmentOwner, EmployeeRef, Priority, Ticket, TicketAllocation, TicketStatus,
};

const TICKET_COLUMNS: &str = "id, type, title, custom_id, description, start_date, due_date, \
     priority_id, list_id, sprint_id, created_at, updated_at, created_by, updated_by, deleted_by";

const ALLOCATION_COLUMNS: &str = "id, title, priority_id, ticket_status_id, custom_id, \
     estimation_seconds, description, start_date, due_date, ticket_id, created_at, updated_at, \
     created_by, updated_by, deleted_by, version";

/// Which tickets the board shows; the list wins when both are set
#[derive(Debug, Clone, Default)]
pub struct BoardFilter {
    pub list_id: Option<String>,
    pub sprint_id: Option<String>,
}

/// Writable ticket fields
#[derive(Debug, Clone, Default)]
pub struct TicketChanges {
    pub kind: String,
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<String>,
    pub list: Option<String>,
    pub sprint: Option<String>,
}

impl From<&Ticket> for TicketChanges {
    fn from(ticket: &Ticket) -> Self {
        Self {
            kind: ticket.kind.clone(),
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            start_date: ticket.start_date,
            due_date: ticket.due_date,
            priority: ticket.priority.clone(),
            list: ticket.list.clone(),
            sprint: ticket.sprint.clone(),
        }
    }
}

/// Writable allocation fields
#[derive(Debug, Clone)]
pub struct AllocationChanges {
    pub title: String,
    pub priority: Option<String>,
    pub ticket_status: Option<String>,
    pub estimation_seconds: i64,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assigned_users: Vec<String>,
    pub ticket: String,
}

impl From<&TicketAllocation> for AllocationChanges {
    fn from(allocation: &TicketAllocation) -> Self {
        Self {
            title: allocation.title.clone(),
            priority: allocation.priority.clone(),
            ticket_status: allocation.ticket_status.clone(),
            estimation_seconds: allocation.estimation_hours,
            description: allocation.description.clone(),
            start_date: allocation.start_date,
            due_date: allocation.due_date,
            assigned_users: allocation.assigned_users.iter().map(|m| m.id.clone()).collect(),
            ticket: allocation.ticket.clone(),
        }
    }
}

/// Allocation row before its people are resolved
struct AllocationRow {
    allocation: TicketAllocation,
    created_by: Vec<String>,
    updated_by: Vec<String>,
    deleted_by: Vec<String>,
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, sqlx::Error> {
    Ok(Ticket {
        id: row.try_get("id")?,
        kind: row.try_get("type")?,
        title: row.try_get("title")?,
        custom_id: row.try_get("custom_id")?,
        description: row.try_get("description")?,
        start_date: row.try_get("start_date")?,
        due_date: row.try_get("due_date")?,
        priority: row.try_get("priority_id")?,
        list: row.try_get("list_id")?,
        sprint: row.try_get("sprint_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        created_by: row.try_get("created_by")?,
        updated_by: row.try_get("updated_by")?,
        deleted_by: row.try_get("deleted_by")?,
        allocations: Vec::new(),
    })
}

fn allocation_from_row(row: &PgRow) -> Result<AllocationRow, sqlx::Error> {
    Ok(AllocationRow {
        allocation: TicketAllocation {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            priority: row.try_get("priority_id")?,
            ticket_status: row.try_get("ticket_status_id")?,
            custom_id: row.try_get("custom_id")?,
            estimation_hours: row.try_get("estimation_seconds")?,
            description: row.try_get("description")?,
            start_date: row.try_get("start_date")?,
            due_date: row.try_get("due_date")?,
            assigned_users: Vec::new(),
            ticket: row.try_get("ticket_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            created_by: Vec::new(),
            updated_by: Vec::new(),
            deleted_by: Vec::new(),
            version: row.try_get("version")?,
        },
        created_by: row.try_get("created_by")?,
        updated_by: row.try_get("updated_by")?,
        deleted_by: row.try_get("deleted_by")?,
    })
}

fn attachment_from_row(owner: AttachmentOwner, row: &PgRow) -> Result<Attachment, sqlx::Error> {
    Ok(Attachment {
        id: row.try_get("id")?,
        owner,
        owner_id: row.try_get("owner_id")?,
        kind: row.try_get("type")?,
        files: row.try_get("file_path")?,
    })
}

fn resolve_refs(ids: &[String], refs: &HashMap<String, EmployeeRef>) -> Vec<EmployeeRef> {
    ids.iter().filter_map(|id| refs.get(id).cloned()).collect()
}

fn unplaced_ticket() -> TrackerError {
    TrackerError::field("list", "A ticket needs a list or a sprint.")
}

impl PostgresManager {
    // Reference data

    pub async fn list_priorities(&self) -> TrackerResult<Vec<Priority>> {
        let rows = sqlx::query("SELECT id, title FROM priorities ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> TrackerResult<Priority> {
                Ok(Priority {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                })
            })
            .collect()
    }

    async fn ticket_statuses(&self, limit: Option<i64>, offset: i64) -> TrackerResult<Vec<TicketStatus>> {
        let rows = sqlx::query(
            "SELECT id, title, icon, color_info, position, category FROM ticket_statuses \
             ORDER BY position, title LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> TrackerResult<TicketStatus> {
                let category: Option<String> = row.try_get("category")?;
                Ok(TicketStatus {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    icon: row.try_get("icon")?,
                    color_info: row.try_get("color_info")?,
                    position: row.try_get("position")?,
                    category: category.map(|c| c.parse()).transpose()?,
                })
            })
            .collect()
    }

    pub async fn list_ticket_statuses(&self, limit: i64, offset: i64) -> TrackerResult<Vec<TicketStatus>> {
        self.ticket_statuses(Some(limit), offset).await
    }

    /// Every status in board order
    pub async fn all_ticket_statuses(&self) -> TrackerResult<Vec<TicketStatus>> {
        self.ticket_statuses(None, 0).await
    }

    pub async fn count_ticket_statuses(&self) -> TrackerResult<i64> {
        Ok(self.count("ticket_statuses").await?)
    }

    // Tickets

    async fn attach_allocations(&self, rows: Vec<PgRow>) -> TrackerResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = rows
            .iter()
            .map(ticket_from_row)
            .collect::<Result<_, _>>()?;
        let ids: Vec<String> = tickets.iter().map(|t| t.id.clone()).collect();

        let query = format!(
            "SELECT {} FROM ticket_allocations WHERE ticket_id = ANY($1) ORDER BY created_at, id",
            ALLOCATION_COLUMNS
        );
        let allocation_rows = sqlx::query(&query)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_ticket: HashMap<String, Vec<TicketAllocation>> = HashMap::new();
        for allocation in self.hydrate_allocations(allocation_rows).await? {
            by_ticket
                .entry(allocation.ticket.clone())
                .or_default()
                .push(allocation);
        }
        for ticket in &mut tickets {
            ticket.allocations = by_ticket.remove(&ticket.id).unwrap_or_default();
        }
        Ok(tickets)
    }

    pub async fn list_tickets(&self, limit: i64, offset: i64) -> TrackerResult<Vec<Ticket>> {
        let query = format!(
            "SELECT {} FROM tickets ORDER BY created_at, id LIMIT $1 OFFSET $2",
            TICKET_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        self.attach_allocations(rows).await
    }

    pub async fn count_tickets(&self) -> TrackerResult<i64> {
        Ok(self.count("tickets").await?)
    }

    pub async fn get_ticket(&self, id: &str) -> TrackerResult<Option<Ticket>> {
        let query = format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS);
        let rows = sqlx::query(&query).bind(id).fetch_all(&self.pool).await?;
        Ok(self.attach_allocations(rows).await?.pop())
    }

    /// Tickets of a list or sprint with all their allocations
    pub async fn board_tickets(&self, filter: &BoardFilter) -> TrackerResult<Vec<Ticket>> {
        let (clause, value) = match (&filter.list_id, &filter.sprint_id) {
            (Some(list), _) => ("WHERE list_id = $1", Some(list.as_str())),
            (None, Some(sprint)) => ("WHERE sprint_id = $1", Some(sprint.as_str())),
            (None, None) => ("WHERE $1::text IS NULL", None),
        };
        let query = format!(
            "SELECT {} FROM tickets {} ORDER BY created_at, id",
            TICKET_COLUMNS, clause
        );
        let rows = sqlx::query(&query)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        self.attach_allocations(rows).await
    }

    /// Insert a ticket under the next global custom id
    ///
    /// The sequence is read and written under a transaction-scoped advisory
    /// lock so concurrent creates never see the same last value.
    pub async fn insert_ticket(&self, changes: &TicketChanges, actor: Option<&str>) -> TrackerResult<String> {
        let mut tx = self.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(TICKET_SEQUENCE_LOCK)
            .execute(&mut *tx)
            .await?;

        let (field, short_code_query, owner) = match (&changes.list, &changes.sprint) {
            (Some(list), _) => (
                "list",
                "SELECT p.short_code FROM lists l JOIN projects p ON p.id = l.project_id WHERE l.id = $1",
                list,
            ),
            (None, Some(sprint)) => (
                "sprint",
                "SELECT p.short_code FROM sprints s JOIN projects p ON p.id = s.project_id WHERE s.id = $1",
                sprint,
            ),
            (None, None) => return Err(unplaced_ticket()),
        };
        let short_code: String = match sqlx::query(short_code_query)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(row) => row.try_get("short_code")?,
            None => {
                return Err(TrackerError::field(
                    field,
                    format!("Invalid pk \"{}\" - object does not exist.", owner),
                ))
            }
        };

        let row = sqlx::query(
            "SELECT MAX(SUBSTRING(custom_id FROM 4)::bigint) AS last FROM tickets \
             WHERE custom_id ~ '^.{3}[0-9]+$'",
        )
        .fetch_one(&mut *tx)
        .await?;
        let last: Option<i64> = row.try_get("last")?;
        let last = last
            .map(u32::try_from)
            .transpose()
            .map_err(|_| CoreError::SequenceOverflow)?;
        let custom_id = next_ticket_custom_id(&short_code, last)
            .map_err(|e| TrackerError::from_core(field, e))?
            .to_string();

        let id = clickup_core::generate_id();
        let created_by: Vec<String> = actor.map(str::to_string).into_iter().collect();
        sqlx::query(
            "INSERT INTO tickets (id, type, title, custom_id, description, start_date, due_date, \
                                  priority_id, list_id, sprint_id, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&id)
        .bind(&changes.kind)
        .bind(&changes.title)
        .bind(&custom_id)
        .bind(&changes.description)
        .bind(changes.start_date)
        .bind(changes.due_date)
        .bind(&changes.priority)
        .bind(&changes.list)
        .bind(&changes.sprint)
        .bind(&created_by)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!("Created ticket {} as {}", id, custom_id);
        Ok(id)
    }

    pub async fn update_ticket(&self, id: &str, changes: &TicketChanges, actor: Option<&str>) -> TrackerResult<()> {
        if changes.list.is_none() && changes.sprint.is_none() {
            return Err(unplaced_ticket());
        }
        sqlx::query(
            "UPDATE tickets SET type = $2, title = $3, description = $4, start_date = $5, \
                due_date = $6, priority_id = $7, list_id = $8, sprint_id = $9, updated_at = NOW(), \
                updated_by = CASE WHEN $10::text IS NULL THEN updated_by \
                                  ELSE array_append(array_remove(updated_by, $10::text), $10::text) END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.kind)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.start_date)
        .bind(changes.due_date)
        .bind(&changes.priority)
        .bind(&changes.list)
        .bind(&changes.sprint)
        .bind(actor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_ticket(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("tickets", id).await?)
    }

    // Allocations

    async fn hydrate_allocations(&self, rows: Vec<PgRow>) -> TrackerResult<Vec<TicketAllocation>> {
        let parsed: Vec<AllocationRow> = rows
            .iter()
            .map(allocation_from_row)
            .collect::<Result<_, _>>()?;
        if parsed.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = parsed.iter().map(|a| a.allocation.id.clone()).collect();

        let assignee_rows = sqlx::query(
            "SELECT allocation_id, team_member_id FROM ticket_allocation_assignees \
             WHERE allocation_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut assignees: HashMap<String, Vec<String>> = HashMap::new();
        for row in &assignee_rows {
            let allocation: String = row.try_get("allocation_id")?;
            assignees
                .entry(allocation)
                .or_default()
                .push(row.try_get("team_member_id")?);
        }

        let member_ids: Vec<String> = assignees
            .values()
            .flatten()
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let members: HashMap<String, _> = self
            .team_members_by_id(&member_ids)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        let employee_ids: Vec<String> = parsed
            .iter()
            .flat_map(|a| a.created_by.iter().chain(&a.updated_by).chain(&a.deleted_by))
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let refs = self.employee_refs(&employee_ids).await?;

        Ok(parsed
            .into_iter()
            .map(|row| {
                let mut allocation = row.allocation;
                allocation.assigned_users = assignees
                    .remove(&allocation.id)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|id| members.get(id).cloned())
                    .collect();
                allocation.created_by = resolve_refs(&row.created_by, &refs);
                allocation.updated_by = resolve_refs(&row.updated_by, &refs);
                allocation.deleted_by = resolve_refs(&row.deleted_by, &refs);
                allocation
            })
            .collect())
    }

    pub async fn list_allocations(&self, limit: i64, offset: i64) -> TrackerResult<Vec<TicketAllocation>> {
        let query = format!(
            "SELECT {} FROM ticket_allocations ORDER BY created_at, id LIMIT $1 OFFSET $2",
            ALLOCATION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_allocations(rows).await
    }

    pub async fn count_allocations(&self) -> TrackerResult<i64> {
        Ok(self.count("ticket_allocations").await?)
    }

    pub async fn get_allocation(&self, id: &str) -> TrackerResult<Option<TicketAllocation>> {
        let query = format!("SELECT {} FROM ticket_allocations WHERE id = $1", ALLOCATION_COLUMNS);
        let rows = sqlx::query(&query).bind(id).fetch_all(&self.pool).await?;
        Ok(self.hydrate_allocations(rows).await?.pop())
    }

    /// Insert an allocation under the next custom id of its ticket
    pub async fn insert_allocation(&self, changes: &AllocationChanges, actor: Option<&str>) -> TrackerResult<String> {
        let mut tx = self.begin().await?;
        let ticket = sqlx::query("SELECT custom_id FROM tickets WHERE id = $1 FOR UPDATE")
            .bind(&changes.ticket)
            .fetch_optional(&mut *tx)
            .await?;
        let ticket_custom_id: String = match ticket {
            Some(row) => row.try_get("custom_id")?,
            None => {
                return Err(TrackerError::field(
                    "ticket",
                    format!("Invalid pk \"{}\" - object does not exist.", changes.ticket),
                ))
            }
        };

        let existing: Vec<String> = sqlx::query("SELECT custom_id FROM ticket_allocations WHERE ticket_id = $1")
            .bind(&changes.ticket)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.try_get("custom_id"))
            .collect::<Result<_, _>>()?;
        let last = highest_sequence::<AllocationCustomId, _>(&existing);
        let custom_id = next_allocation_custom_id(&ticket_custom_id, last)
            .map_err(|e| TrackerError::from_core("ticket", e))?
            .to_string();

        let id = clickup_core::generate_id();
        let created_by: Vec<String> = actor.map(str::to_string).into_iter().collect();
        sqlx::query(
            "INSERT INTO ticket_allocations (id, title, priority_id, ticket_status_id, custom_id, \
                estimation_seconds, description, start_date, due_date, ticket_id, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&id)
        .bind(&changes.title)
        .bind(&changes.priority)
        .bind(&changes.ticket_status)
        .bind(&custom_id)
        .bind(changes.estimation_seconds)
        .bind(&changes.description)
        .bind(changes.start_date)
        .bind(changes.due_date)
        .bind(&changes.ticket)
        .bind(&created_by)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO ticket_allocation_assignees (allocation_id, team_member_id) \
             SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(&id)
        .bind(&changes.assigned_users)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!("Created allocation {} as {}", id, custom_id);
        Ok(id)
    }

    /// Update an allocation, bumping its version and replacing assignees
    pub async fn update_allocation(
        &self,
        id: &str,
        changes: &AllocationChanges,
        actor: Option<&str>,
    ) -> TrackerResult<()> {
        let mut tx = self.begin().await?;
        let ticket: String = sqlx::query("SELECT ticket_id FROM ticket_allocations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| TrackerError::not_found("Ticket allocation"))?
            .try_get("ticket_id")?;
        // The custom id embeds the ticket, so the owner is fixed
        if ticket != changes.ticket {
            return Err(TrackerError::field(
                "ticket",
                "The ticket of an allocation cannot be changed.",
            ));
        }

        sqlx::query(
            "UPDATE ticket_allocations SET title = $2, priority_id = $3, ticket_status_id = $4, \
                estimation_seconds = $5, description = $6, start_date = $7, due_date = $8, \
                updated_at = NOW(), version = version + 1, \
                updated_by = CASE WHEN $9::text IS NULL THEN updated_by \
                                  ELSE array_append(array_remove(updated_by, $9::text), $9::text) END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.priority)
        .bind(&changes.ticket_status)
        .bind(changes.estimation_seconds)
        .bind(&changes.description)
        .bind(changes.start_date)
        .bind(changes.due_date)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM ticket_allocation_assignees WHERE allocation_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO ticket_allocation_assignees (allocation_id, team_member_id) \
             SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&changes.assigned_users)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_allocation(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id("ticket_allocations", id).await?)
    }

    // Attachments

    pub async fn attachment_owner_exists(&self, owner: AttachmentOwner, id: &str) -> TrackerResult<bool> {
        let table = match owner {
            AttachmentOwner::Ticket => "tickets",
            AttachmentOwner::Allocation => "ticket_allocations",
        };
        Ok(self.exists(table, id).await?)
    }

    pub async fn list_attachments(&self, owner: AttachmentOwner, owner_id: &str) -> TrackerResult<Vec<Attachment>> {
        let query = format!(
            "SELECT id, type, {col} AS owner_id, file_path FROM {table} \
             WHERE {col} = $1 ORDER BY created_at, id",
            col = owner.owner_column(),
            table = owner.table()
        );
        let rows = sqlx::query(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| attachment_from_row(owner, row))
            .collect::<Result<_, _>>()?)
    }

    pub async fn get_attachment(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
        id: &str,
    ) -> TrackerResult<Option<Attachment>> {
        let query = format!(
            "SELECT id, type, {col} AS owner_id, file_path FROM {table} WHERE {col} = $1 AND id = $2",
            col = owner.owner_column(),
            table = owner.table()
        );
        let row = sqlx::query(&query)
            .bind(owner_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(|r| attachment_from_row(owner, r)).transpose()?)
    }

    pub async fn insert_attachment(&self, attachment: &Attachment) -> TrackerResult<()> {
        let query = format!(
            "INSERT INTO {} (id, type, {}, file_path) VALUES ($1, $2, $3, $4)",
            attachment.owner.table(),
            attachment.owner.owner_column()
        );
        sqlx::query(&query)
            .bind(&attachment.id)
            .bind(&attachment.kind)
            .bind(&attachment.owner_id)
            .bind(&attachment.files)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_attachment(&self, owner: AttachmentOwner, id: &str) -> TrackerResult<bool> {
        Ok(self.delete_by_id(owner.table(), id).await?)
    }
}
