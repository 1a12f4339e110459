//! Colored terminal output for CLI commands.

use owo_colors::OwoColorize;

use crate::toast::{Toast, ToastLevel};
use crate::types::{Ticket, TicketPriority, TicketStatus, User};

/// Width of the abbreviated ticket id shown in listings
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Truncate to `max_len` characters, appending "..." when cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

pub fn format_date(ts: &jiff::Timestamp) -> String {
    ts.strftime("%Y-%m-%d %H:%M").to_string()
}

pub fn format_status_colored(status: TicketStatus) -> String {
    let badge = format!("[{}]", status);
    match status {
        TicketStatus::Open => badge.red().to_string(),
        TicketStatus::InProgress => badge.yellow().to_string(),
        TicketStatus::Resolved => badge.green().to_string(),
    }
}

pub fn format_priority_colored(priority: TicketPriority) -> String {
    let badge = format!("{}", priority);
    match priority {
        TicketPriority::High => badge.red().bold().to_string(),
        TicketPriority::Medium => badge.yellow().to_string(),
        TicketPriority::Low => badge.green().to_string(),
    }
}

/// Single-line listing entry
pub fn format_ticket_line(ticket: &Ticket) -> String {
    let comments = match ticket.comments.len() {
        0 => String::new(),
        1 => " (1 comment)".dimmed().to_string(),
        n => format!(" ({n} comments)").dimmed().to_string(),
    };
    format!(
        "{} {} {:<6} {} {}{}",
        format!("{:<width$}", short_id(&ticket.id), width = SHORT_ID_LEN).cyan(),
        format_status_colored(ticket.status),
        format_priority_colored(ticket.priority),
        format_date(&ticket.created_at).dimmed(),
        ticket.title,
        comments
    )
}

/// Full ticket with its comment thread
pub fn format_ticket_detail(ticket: &Ticket, viewer: Option<&User>) -> String {
    let mut out = format!(
        "{} {}\n",
        ticket.title.bold(),
        format_status_colored(ticket.status)
    );
    out.push_str(&format!("{} {}\n", "id:".dimmed(), ticket.id));
    out.push_str(&format!(
        "{} {}\n",
        "priority:".dimmed(),
        format_priority_colored(ticket.priority)
    ));
    out.push_str(&format!(
        "{} {}\n",
        "opened:".dimmed(),
        format_date(&ticket.created_at)
    ));
    out.push_str(&format!(
        "{} {}\n",
        "by:".dimmed(),
        author_label(&ticket.user_id, viewer)
    ));
    if let Some(assignee) = &ticket.assigned_to {
        out.push_str(&format!(
            "{} {}\n",
            "assigned:".dimmed(),
            author_label(assignee, viewer)
        ));
    }
    if !ticket.description.is_empty() {
        out.push('\n');
        out.push_str(&ticket.description);
        out.push('\n');
    }

    out.push_str(&format!("\n{}\n", "## Comments".bold()));
    if ticket.comments.is_empty() {
        out.push_str(&"No comments yet.".dimmed().to_string());
        out.push('\n');
    }
    for comment in &ticket.comments {
        out.push_str(&format!(
            "\n{} {}\n{}\n",
            author_label(&comment.user_id, viewer).cyan(),
            format_date(&comment.created_at).dimmed(),
            comment.content
        ));
    }
    out
}

/// "you" for the viewer's own id, the short id otherwise
pub fn author_label(user_id: &str, viewer: Option<&User>) -> String {
    match viewer {
        Some(user) if user.id == user_id => "you".to_string(),
        _ => short_id(user_id).to_string(),
    }
}

pub fn format_user(user: &User) -> String {
    format!("{} <{}> ({})", user.name.bold(), user.email, user.role)
}

pub fn format_toast(toast: &Toast) -> String {
    match toast.level {
        ToastLevel::Success => format!("{} {}", "✓".green(), toast.message),
        ToastLevel::Error => format!("{} {}", "✗".red(), toast.message),
        ToastLevel::Warning => format!("{} {}", "!".yellow(), toast.message),
        ToastLevel::Info => format!("{} {}", "i".cyan(), toast.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn user() -> User {
        User {
            id: "user-0001-aaaa".to_string(),
            email: "sam@example.com".to_string(),
            name: "Sam".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn test_short_id_handles_short_and_multibyte() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
        assert_eq!(short_id("ééééééééé"), "éééééééé");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hello", 2), "he");
    }

    #[test]
    fn test_author_label() {
        let me = user();
        assert_eq!(author_label("user-0001-aaaa", Some(&me)), "you");
        assert_eq!(author_label("other-user-id", Some(&me)), "other-us");
        assert_eq!(author_label("other-user-id", None), "other-us");
    }

    #[test]
    fn test_format_date() {
        let ts: jiff::Timestamp = "2024-05-01T08:30:59Z".parse().unwrap();
        assert_eq!(format_date(&ts), "2024-05-01 08:30");
    }
}
