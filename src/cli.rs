use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::str::FromStr;

use crate::types::{TicketPriority, TicketStatus, VALID_PRIORITIES, VALID_STATUSES};

#[derive(Parser)]
#[command(name = "ticketdesk")]
#[command(about = "Support ticket desk")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in to the backend
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,

        /// Account password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tickets, newest first
    Ls {
        /// Only tickets with this status (open, in-progress, resolved)
        #[arg(long, value_parser = parse_status)]
        status: Option<TicketStatus>,

        /// Only tickets with this priority (low, medium, high)
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TicketPriority>,

        /// Only tickets you opened
        #[arg(long)]
        mine: bool,

        /// Maximum number of tickets to show
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a ticket and its comments
    #[command(visible_alias = "s")]
    Show {
        /// Ticket ID (can be partial)
        #[arg(value_parser = parse_ticket_id)]
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open a new ticket
    #[command(visible_alias = "c")]
    Create {
        /// Ticket title
        title: String,

        /// Description text
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high (default: medium)
        #[arg(short, long, default_value = "medium", value_parser = parse_priority)]
        priority: TicketPriority,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a ticket's status (admin only)
    Status {
        /// Ticket ID (can be partial)
        #[arg(value_parser = parse_ticket_id)]
        id: String,

        /// New status (open, in-progress, resolved)
        #[arg(value_parser = parse_status)]
        status: TicketStatus,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update ticket fields
    Set {
        /// Ticket ID (can be partial)
        #[arg(value_parser = parse_ticket_id)]
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New priority (low, medium, high)
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TicketPriority>,

        /// User ID to assign the ticket to
        #[arg(long)]
        assignee: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a comment to a ticket
    Comment {
        /// Ticket ID (can be partial)
        #[arg(value_parser = parse_ticket_id)]
        id: String,

        /// Comment text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive ticket desk
    Tui {
        /// Run against an in-process backend seeded with demo data
        #[arg(long)]
        demo: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for [possible values: bash, zsh, fish, powershell, elvish]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (service.url, service.api_key, sync.poll_interval_ms, sync.coalesce_ms, remote_timeout)
        key: String,
        /// Value to set
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Whether the command draws a full-screen UI and must not log to the terminal
    pub fn is_interactive(&self) -> bool {
        matches!(self, Commands::Tui { .. })
    }

    /// Execute the command, dispatching to the appropriate handler.
    pub async fn run(self) -> crate::error::Result<()> {
        use crate::commands::{
            Desk, LsOptions, SetOptions, cmd_comment, cmd_config_get, cmd_config_set,
            cmd_config_show, cmd_create, cmd_login, cmd_logout, cmd_ls, cmd_set, cmd_show,
            cmd_status, cmd_tui, cmd_whoami,
        };

        match self {
            Commands::Tui { demo } => return cmd_tui(demo).await,
            Commands::Config { action } => {
                return match action {
                    ConfigAction::Show { json } => cmd_config_show(json),
                    ConfigAction::Set { key, value, json } => cmd_config_set(&key, &value, json),
                    ConfigAction::Get { key, json } => cmd_config_get(&key, json),
                };
            }
            Commands::Completions { shell } => {
                generate_completions(shell);
                return Ok(());
            }
            _ => {}
        }

        let desk = Desk::hosted()?;
        let result = match self {
            Commands::Login {
                email,
                password,
                json,
            } => cmd_login(&desk, email, password, json).await,
            Commands::Logout { json } => cmd_logout(&desk, json).await,
            Commands::Whoami { json } => cmd_whoami(&desk, json).await,
            Commands::Ls {
                status,
                priority,
                mine,
                limit,
                json,
            } => {
                let options = LsOptions {
                    status,
                    priority,
                    mine,
                    limit,
                };
                cmd_ls(&desk, options, json).await
            }
            Commands::Show { id, json } => cmd_show(&desk, &id, json).await,
            Commands::Create {
                title,
                description,
                priority,
                json,
            } => cmd_create(&desk, &title, description.as_deref(), priority, json).await,
            Commands::Status { id, status, json } => cmd_status(&desk, &id, status, json).await,
            Commands::Set {
                id,
                title,
                description,
                priority,
                assignee,
                json,
            } => {
                let options = SetOptions {
                    title,
                    description,
                    priority,
                    assignee,
                };
                cmd_set(&desk, &id, options, json).await
            }
            Commands::Comment { id, text, json } => {
                cmd_comment(&desk, &id, &text.join(" "), json).await
            }
            Commands::Tui { .. } | Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
        };
        desk.close();
        result
    }
}

/// Generic validation helper for parsing values with a standard error message format.
fn parse_with_validation<T, F>(
    s: &str,
    parser: F,
    field_name: &str,
    valid_values: &[&str],
) -> Result<T, String>
where
    F: FnOnce(&str) -> Result<T, String>,
{
    parser(s).map_err(|_| {
        format!(
            "Invalid {}. Must be one of: {}",
            field_name,
            valid_values.join(", ")
        )
    })
}

fn parse_priority(s: &str) -> Result<TicketPriority, String> {
    parse_with_validation(
        s,
        |v| v.parse().map_err(|_| String::new()),
        "priority",
        VALID_PRIORITIES,
    )
}

fn parse_status(s: &str) -> Result<TicketStatus, String> {
    parse_with_validation(
        s,
        |v| TicketStatus::from_str(v).map_err(|_| String::new()),
        "status",
        VALID_STATUSES,
    )
}

fn parse_ticket_id(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("ID cannot be empty".to_string());
    }

    if !trimmed.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return Err("ID must contain only hexadecimal digits and hyphens".to_string());
    }

    Ok(trimmed.to_string())
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "ticketdesk", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_status_valid() {
        assert_eq!(parse_status("open").unwrap(), TicketStatus::Open);
        assert_eq!(parse_status("in-progress").unwrap(), TicketStatus::InProgress);
        assert_eq!(parse_status("in_progress").unwrap(), TicketStatus::InProgress);
        assert_eq!(parse_status("RESOLVED").unwrap(), TicketStatus::Resolved);
    }

    #[test]
    fn test_parse_status_error_message_lists_valid_values() {
        let err = parse_status("closed").unwrap_err();
        assert!(
            err.contains("open") && err.contains("in-progress") && err.contains("resolved"),
            "Error should list valid status values, got: {err}"
        );
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("high").unwrap(), TicketPriority::High);
        let err = parse_priority("urgent").unwrap_err();
        assert!(err.contains("low, medium, high"));
    }

    #[test]
    fn test_parse_ticket_id() {
        assert_eq!(parse_ticket_id(" 3f2a ").unwrap(), "3f2a");
        assert!(parse_ticket_id("").is_err());
        assert!(parse_ticket_id("   ").is_err());
        assert!(parse_ticket_id("abc;drop").is_err());
    }

    #[test]
    fn test_comment_joins_words() {
        let cli = Cli::try_parse_from(["ticketdesk", "comment", "ab12", "still", "broken"]).unwrap();
        match cli.command {
            Commands::Comment { id, text, json } => {
                assert_eq!(id, "ab12");
                assert_eq!(text.join(" "), "still broken");
                assert!(!json);
            }
            _ => panic!("expected comment command"),
        }
    }

    #[test]
    fn test_create_defaults_to_medium() {
        let cli = Cli::try_parse_from(["ticketdesk", "create", "Printer jam"]).unwrap();
        match cli.command {
            Commands::Create { priority, .. } => assert_eq!(priority, TicketPriority::Medium),
            _ => panic!("expected create command"),
        }
    }
}
