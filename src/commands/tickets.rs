//! Ticket commands: `ls`, `show`, `create`, `status`, `set` and `comment`

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, Desk};
use crate::display::{format_ticket_detail, format_ticket_line, short_id};
use crate::error::{DeskError, Result};
use crate::finder::find_ticket;
use crate::types::{NewTicket, Ticket, TicketPatch, TicketPriority, TicketStatus};
use crate::validate;

/// Filters for `ls`
#[derive(Debug, Clone, Default)]
pub struct LsOptions {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    /// Only tickets opened by the signed-in user
    pub mine: bool,
    pub limit: Option<usize>,
}

impl LsOptions {
    fn matches(&self, ticket: &Ticket, user_id: &str) -> bool {
        self.status.is_none_or(|s| ticket.status == s)
            && self.priority.is_none_or(|p| ticket.priority == p)
            && (!self.mine || ticket.user_id == user_id)
    }
}

/// Fields for `set`. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
    pub assignee: Option<String>,
}

pub async fn cmd_ls(desk: &Desk, options: LsOptions, output_json: bool) -> Result<()> {
    let user = desk.require_user().await?;
    let tickets: Vec<Ticket> = desk
        .load_tickets()
        .await?
        .into_iter()
        .filter(|t| options.matches(t, &user.id))
        .take(options.limit.unwrap_or(usize::MAX))
        .collect();

    let text = if tickets.is_empty() {
        "No tickets found".dimmed().to_string()
    } else {
        tickets
            .iter()
            .map(format_ticket_line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    CommandOutput::new(serde_json::to_value(&tickets)?)
        .with_text(text)
        .print(output_json)
}

pub async fn cmd_show(desk: &Desk, id: &str, output_json: bool) -> Result<()> {
    let user = desk.require_user().await?;
    let tickets = desk.load_tickets().await?;
    let ticket = find_ticket(&tickets, id)?;

    CommandOutput::new(serde_json::to_value(ticket)?)
        .with_text(format_ticket_detail(ticket, Some(&user)))
        .print(output_json)
}

pub async fn cmd_create(
    desk: &Desk,
    title: &str,
    description: Option<&str>,
    priority: TicketPriority,
    output_json: bool,
) -> Result<()> {
    let user = desk.require_user().await?;
    let title = validate::title(title)?;
    let description = match description {
        Some(text) => validate::description(text)?,
        None => "",
    };

    desk.tickets
        .create_ticket(NewTicket::new(title, description, priority, &user.id))
        .await?;

    CommandOutput::new(json!({
        "action": "created",
        "title": title,
        "priority": priority,
        "status": TicketStatus::Open,
    }))
    .with_text(format!("Created {} ({})", title.bold(), priority))
    .print(output_json)
}

/// Change a ticket's status. Only admins may do this.
pub async fn cmd_status(
    desk: &Desk,
    id: &str,
    status: TicketStatus,
    output_json: bool,
) -> Result<()> {
    desk.require_admin("change ticket status").await?;
    let tickets = desk.load_tickets().await?;
    let ticket = find_ticket(&tickets, id)?;
    let previous = ticket.status;

    desk.tickets.set_status(&ticket.id, status).await?;

    CommandOutput::new(json!({
        "id": ticket.id,
        "action": "status_changed",
        "previous_status": previous,
        "new_status": status,
    }))
    .with_text(format!(
        "{} {} -> {}",
        short_id(&ticket.id).cyan(),
        previous,
        status
    ))
    .print(output_json)
}

pub async fn cmd_set(desk: &Desk, id: &str, options: SetOptions, output_json: bool) -> Result<()> {
    desk.require_user().await?;

    let mut patch = TicketPatch {
        priority: options.priority,
        assigned_to: options.assignee,
        ..TicketPatch::default()
    };
    if let Some(title) = options.title.as_deref() {
        patch.title = Some(validate::title(title)?.to_string());
    }
    if let Some(description) = options.description.as_deref() {
        patch.description = Some(validate::description(description)?.to_string());
    }
    if patch.is_empty() {
        return Err(DeskError::required(
            "one of --title, --description, --priority or --assignee",
        ));
    }

    let tickets = desk.load_tickets().await?;
    let ticket = find_ticket(&tickets, id)?;
    desk.tickets.update_ticket(&ticket.id, patch.clone()).await?;

    CommandOutput::new(json!({
        "id": ticket.id,
        "action": "updated",
        "changes": patch,
    }))
    .with_text(format!("Updated {}", short_id(&ticket.id).cyan()))
    .print(output_json)
}

pub async fn cmd_comment(desk: &Desk, id: &str, text: &str, output_json: bool) -> Result<()> {
    let user = desk.require_user().await?;
    let content = validate::comment(text)?;
    let tickets = desk.load_tickets().await?;
    let ticket = find_ticket(&tickets, id)?;

    desk.tickets.add_comment(&ticket.id, content, &user.id).await?;

    CommandOutput::new(json!({
        "id": ticket.id,
        "action": "comment_added",
        "content": content,
    }))
    .with_text(format!("Commented on {}", short_id(&ticket.id).cyan()))
    .print(output_json)
}
