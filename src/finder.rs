//! Find a ticket by full or partial ID.
//!
//! An exact ID match wins. Otherwise the ID is treated as a prefix; more
//! than one match is an `AmbiguousId` error.

use crate::error::{DeskError, Result};
use crate::types::Ticket;

pub fn find_ticket<'a>(tickets: &'a [Ticket], partial_id: &str) -> Result<&'a Ticket> {
    let partial_id = partial_id.trim();
    if partial_id.is_empty() {
        return Err(DeskError::required("ticket id"));
    }

    if let Some(exact) = tickets.iter().find(|t| t.id == partial_id) {
        return Ok(exact);
    }

    let needle = partial_id.to_lowercase();
    let mut matches = tickets
        .iter()
        .filter(|t| t.id.to_lowercase().starts_with(&needle));
    match (matches.next(), matches.next()) {
        (Some(ticket), None) => Ok(ticket),
        (Some(_), Some(_)) => Err(DeskError::AmbiguousId(partial_id.to_string())),
        (None, _) => Err(DeskError::TicketNotFound(partial_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TicketPriority, TicketStatus};

    fn ticket(id: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            user_id: "u1".to_string(),
            assigned_to: None,
            comments: vec![],
        }
    }

    #[test]
    fn test_exact_match_beats_prefix() {
        let tickets = vec![ticket("ab"), ticket("abc")];
        assert_eq!(find_ticket(&tickets, "ab").unwrap().id, "ab");
    }

    #[test]
    fn test_unique_prefix() {
        let tickets = vec![ticket("abc123"), ticket("def456")];
        assert_eq!(find_ticket(&tickets, "DEF").unwrap().id, "def456");
    }

    #[test]
    fn test_ambiguous_prefix() {
        let tickets = vec![ticket("abc123"), ticket("abd456")];
        assert!(matches!(
            find_ticket(&tickets, "ab"),
            Err(DeskError::AmbiguousId(_))
        ));
    }

    #[test]
    fn test_not_found() {
        let tickets = vec![ticket("abc123")];
        assert!(matches!(
            find_ticket(&tickets, "zzz"),
            Err(DeskError::TicketNotFound(_))
        ));
        assert!(find_ticket(&tickets, " ").is_err());
    }
}
