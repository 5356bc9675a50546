//! Ticket board grouped by allocation status

use serde::Serialize;

use crate::models::{Ticket, TicketGroup, TicketStatus};

/// One group per status, in status order. A ticket shows up in a group when
/// it has an allocation in that status and carries only those allocations.
/// Statuses without tickets are left out.
pub fn group_by_status(statuses: &[TicketStatus], tickets: &[Ticket]) -> Vec<TicketGroup> {
    statuses
        .iter()
        .filter_map(|status| {
            let data: Vec<Ticket> = tickets
                .iter()
                .filter_map(|ticket| {
                    let allocations: Vec<_> = ticket
                        .allocations
                        .iter()
                        .filter(|a| a.ticket_status.as_deref() == Some(status.id.as_str()))
                        .cloned()
                        .collect();
                    if allocations.is_empty() {
                        return None;
                    }
                    let mut ticket = ticket.clone();
                    ticket.allocations = allocations;
                    Some(ticket)
                })
                .collect();
            if data.is_empty() {
                None
            } else {
                Some(TicketGroup {
                    id: status.id.clone(),
                    group_by_id: status.id.clone(),
                    data,
                })
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardPagination {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupCount {
    pub count: usize,
}

/// `data` payload of the board query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPage {
    pub ticket_data: Vec<TicketGroup>,
    pub pagination: BoardPagination,
    pub total_count: Vec<GroupCount>,
}

impl BoardPage {
    /// Slice `groups` to the requested page; `None` when the page is out of range
    pub fn paginate(groups: Vec<TicketGroup>, page: u32, limit: u32) -> Option<Self> {
        let limit = limit.max(1);
        let page = page.max(1);
        let offset = (page as usize - 1) * limit as usize;
        if page > 1 && offset >= groups.len() {
            return None;
        }

        let ticket_data: Vec<TicketGroup> = groups
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();
        let total_count = ticket_data
            .iter()
            .map(|group| GroupCount {
                count: group.data.len(),
            })
            .collect();
        Some(Self {
            ticket_data,
            pagination: BoardPagination { page, limit },
            total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketAllocation;
    use chrono::Utc;

    fn status(id: &str, position: i32) -> TicketStatus {
        TicketStatus {
            id: id.to_string(),
            title: id.to_uppercase(),
            icon: "dot".to_string(),
            color_info: "#fff".to_string(),
            position,
            category: None,
        }
    }

    fn allocation(id: &str, ticket: &str, status: Option<&str>) -> TicketAllocation {
        let now = Utc::now();
        TicketAllocation {
            id: id.to_string(),
            title: id.to_string(),
            priority: None,
            ticket_status: status.map(str::to_string),
            custom_id: format!("ABC00001#{}", id),
            estimation_hours: 3600,
            description: String::new(),
            start_date: None,
            due_date: None,
            assigned_users: Vec::new(),
            ticket: ticket.to_string(),
            created_at: now,
            updated_at: now,
            created_by: Vec::new(),
            updated_by: Vec::new(),
            deleted_by: Vec::new(),
            version: 0,
        }
    }

    fn ticket(id: &str, allocations: Vec<TicketAllocation>) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: id.to_string(),
            kind: "task".to_string(),
            title: id.to_string(),
            custom_id: "ABC00001".to_string(),
            description: String::new(),
            start_date: None,
            due_date: None,
            priority: None,
            list: Some("l1".to_string()),
            sprint: None,
            created_at: now,
            updated_at: now,
            created_by: Vec::new(),
            updated_by: Vec::new(),
            deleted_by: Vec::new(),
            allocations,
        }
    }

    #[test]
    fn groups_follow_status_order_and_skip_empty_statuses() {
        let statuses = vec![status("todo", 0), status("doing", 1), status("done", 2)];
        let tickets = vec![
            ticket("t1", vec![allocation("a1", "t1", Some("todo")), allocation("a2", "t1", Some("done"))]),
            ticket("t2", vec![allocation("a3", "t2", Some("done"))]),
            ticket("t3", vec![allocation("a4", "t3", None)]),
        ];

        let groups = group_by_status(&statuses, &tickets);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_by_id, "todo");
        assert_eq!(groups[0].data.len(), 1);
        assert_eq!(groups[1].id, "done");
        assert_eq!(groups[1].data.len(), 2);
    }

    #[test]
    fn tickets_carry_only_allocations_of_their_group() {
        let statuses = vec![status("todo", 0), status("done", 1)];
        let tickets = vec![ticket(
            "t1",
            vec![allocation("a1", "t1", Some("todo")), allocation("a2", "t1", Some("done"))],
        )];

        let groups = group_by_status(&statuses, &tickets);

        let todo: Vec<_> = groups[0].data[0].allocations.iter().map(|a| a.id.as_str()).collect();
        let done: Vec<_> = groups[1].data[0].allocations.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(todo, vec!["a1"]);
        assert_eq!(done, vec!["a2"]);
    }

    #[test]
    fn paginates_groups() {
        let statuses: Vec<_> = (0..3).map(|i| status(&format!("s{}", i), i)).collect();
        let tickets: Vec<_> = (0..3)
            .map(|i| {
                let status_id = format!("s{}", i);
                let alloc = allocation(&format!("a{}", i), "t", Some(status_id.as_str()));
                ticket(&format!("t{}", i), vec![alloc])
            })
            .collect();
        let groups = group_by_status(&statuses, &tickets);

        let page = BoardPage::paginate(groups.clone(), 2, 2).unwrap();
        assert_eq!(page.ticket_data.len(), 1);
        assert_eq!(page.ticket_data[0].id, "s2");
        assert_eq!(page.total_count[0].count, 1);
        assert_eq!(page.pagination.page, 2);

        assert!(BoardPage::paginate(groups, 3, 2).is_none());
        let empty = BoardPage::paginate(Vec::new(), 1, 10).unwrap();
        assert!(empty.ticket_data.is_empty());
    }
}
