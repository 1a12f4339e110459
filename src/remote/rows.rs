//! Wire rows and their mapping onto the local view model.
//!
//! Rows use the backend's snake_case column names (`created_at`, `user_id`,
//! `ticket_id`). The local types in [`crate::types`] are what the rest of
//! the crate works with.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{AuthUser, Row, from_row};
use crate::types::{Comment, Role, Ticket, TicketPriority, TicketStatus, User, display_name_for};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl ProfileRow {
    /// Resolve a user from this profile, filling gaps from the auth identity
    pub fn into_user(self, identity: &AuthUser) -> User {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| identity.email.clone());
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| display_name_for(&email));
        User {
            id: self.id,
            email,
            name,
            role: self.role.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: Timestamp,
    pub user_id: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl TicketRow {
    pub fn into_ticket(self, comments: Vec<Comment>) -> Ticket {
        Ticket {
            id: self.id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            status: self.status,
            priority: self.priority,
            created_at: self.created_at,
            user_id: self.user_id,
            assigned_to: self.assigned_to,
            comments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: String,
    pub ticket_id: String,
    pub content: String,
    pub user_id: String,
    pub created_at: Timestamp,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            ticket_id: row.ticket_id,
            content: row.content,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// Insert payload for the comments table
#[derive(Debug, Clone, Serialize)]
pub struct NewCommentRow<'a> {
    pub ticket_id: &'a str,
    pub content: &'a str,
    pub user_id: &'a str,
}

/// Decode rows, skipping (and logging) any that do not match the expected shape.
pub fn parse_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row
                .get("id")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            match from_row::<T>(row) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Skipping malformed {table} row {id}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Attach comments to their tickets.
///
/// Ticket order is preserved. Each ticket's comments are ordered by creation
/// time ascending; comments whose ticket is not in the list are dropped.
pub fn assemble_tickets(tickets: Vec<TicketRow>, comments: Vec<CommentRow>) -> Vec<Ticket> {
    let mut by_ticket: HashMap<String, Vec<Comment>> = HashMap::new();
    for comment in comments {
        by_ticket
            .entry(comment.ticket_id.clone())
            .or_default()
            .push(comment.into());
    }

    let assembled: Vec<Ticket> = tickets
        .into_iter()
        .map(|row| {
            let mut thread = by_ticket.remove(&row.id).unwrap_or_default();
            thread.sort_by_key(|c| c.created_at);
            row.into_ticket(thread)
        })
        .collect();

    if !by_ticket.is_empty() {
        let orphaned: usize = by_ticket.values().map(Vec::len).sum();
        tracing::debug!("Dropped {orphaned} comments without a matching ticket");
    }

    assembled
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity() -> AuthUser {
        AuthUser {
            id: "u1".to_string(),
            email: "sam@example.com".to_string(),
        }
    }

    fn ticket_row(id: &str, created_at: &str) -> TicketRow {
        TicketRow {
            id: id.to_string(),
            title: format!("Ticket {id}"),
            description: None,
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            created_at: created_at.parse().unwrap(),
            user_id: "u1".to_string(),
            assigned_to: None,
        }
    }

    fn comment_row(id: &str, ticket_id: &str, created_at: &str) -> CommentRow {
        CommentRow {
            id: id.to_string(),
            ticket_id: ticket_id.to_string(),
            content: format!("comment {id}"),
            user_id: "u1".to_string(),
            created_at: created_at.parse().unwrap(),
        }
    }

    #[test]
    fn test_profile_fills_missing_fields() {
        let row = ProfileRow {
            id: "u1".to_string(),
            email: None,
            name: Some("  ".to_string()),
            role: None,
        };
        let user = row.into_user(&identity());
        assert_eq!(user.email, "sam@example.com");
        assert_eq!(user.name, "sam");
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn test_profile_keeps_admin_role() {
        let row: ProfileRow = from_row(
            json!({"id": "u1", "email": "boss@example.com", "name": "Boss", "role": "admin"})
                .as_object()
                .cloned()
                .unwrap(),
        )
        .unwrap();
        let user = row.into_user(&identity());
        assert!(user.is_admin());
        assert_eq!(user.name, "Boss");
        assert_eq!(user.email, "boss@example.com");
    }

    #[test]
    fn test_ticket_row_maps_wire_names() {
        let row: TicketRow = from_row(
            json!({
                "id": "t1",
                "title": "Broken VPN",
                "description": null,
                "status": "in-progress",
                "priority": "high",
                "created_at": "2024-05-01T08:30:00.123456+00:00",
                "user_id": "u9",
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .unwrap();
        let ticket = row.into_ticket(vec![]);
        assert_eq!(ticket.user_id, "u9");
        assert_eq!(ticket.description, "");
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(ticket.assigned_to, None);
    }

    #[test]
    fn test_assemble_orders_comments_ascending() {
        let tickets = vec![
            ticket_row("t2", "2024-01-02T00:00:00Z"),
            ticket_row("t1", "2024-01-01T00:00:00Z"),
        ];
        let comments = vec![
            comment_row("c2", "t1", "2024-01-03T00:00:00Z"),
            comment_row("c1", "t1", "2024-01-02T12:00:00Z"),
            comment_row("c3", "gone", "2024-01-04T00:00:00Z"),
        ];

        let assembled = assemble_tickets(tickets, comments);
        assert_eq!(assembled.len(), 2);
        assert_eq!(assembled[0].id, "t2");
        assert!(assembled[0].comments.is_empty());
        let ids: Vec<&str> = assembled[1].comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn test_parse_rows_skips_malformed() {
        let rows = vec![
            json!({"id": "c1", "ticket_id": "t1", "content": "hi", "user_id": "u1", "created_at": "2024-01-01T00:00:00Z"}),
            json!({"id": "c2", "content": "no ticket"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
        let parsed: Vec<CommentRow> = parse_rows("comments", rows);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "c1");
    }
}
