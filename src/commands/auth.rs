//! Session commands: `login`, `logout` and `whoami`

use std::io::{self, BufRead, Write};

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, Desk};
use crate::display::format_user;
use crate::error::Result;
use crate::validate;

/// Ask for a value on stderr and read one line from stdin
fn prompt(label: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}: ", label)?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_login(
    desk: &Desk,
    email: Option<String>,
    password: Option<String>,
    output_json: bool,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt("Password")?,
    };
    let (email, password) = validate::credentials(&email, &password)?;

    let user = desk.session.login(email, password).await?;

    CommandOutput::new(json!({
        "action": "login",
        "user": user,
    }))
    .with_text(format!("Signed in as {}", format_user(&user)))
    .print(output_json)
}

/// Sign out. Not being signed in is not an error.
///
/// A session whose profile cannot be resolved is still signed out.
pub async fn cmd_logout(desk: &Desk, output_json: bool) -> Result<()> {
    let was_signed_in = match desk.current_user().await {
        Ok(user) => user.is_some(),
        Err(e) => {
            tracing::warn!("Could not resolve the current user, signing out anyway: {}", e);
            true
        }
    };
    desk.session.logout().await?;

    let text = if was_signed_in {
        "Signed out".to_string()
    } else {
        "Not signed in".dimmed().to_string()
    };
    CommandOutput::new(json!({
        "action": "logout",
        "was_signed_in": was_signed_in,
    }))
    .with_text(text)
    .print(output_json)
}

pub async fn cmd_whoami(desk: &Desk, output_json: bool) -> Result<()> {
    let user = desk.current_user().await?;

    let text = match &user {
        Some(user) => format_user(user),
        None => "Not signed in. Run: ticketdesk login".dimmed().to_string(),
    };
    CommandOutput::new(json!({
        "signed_in": user.is_some(),
        "user": user,
    }))
    .with_text(text)
    .print(output_json)
}
