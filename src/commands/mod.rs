//! CLI command implementations
//!
//! Commands that talk to the backend run against a [`Desk`]: one service
//! plus the session and ticket stores built on it.

mod auth;
mod config;
mod tickets;
mod tui;

pub use auth::{cmd_login, cmd_logout, cmd_whoami};
pub use config::{cmd_config_get, cmd_config_set, cmd_config_show};
pub use tickets::{
    LsOptions, SetOptions, cmd_comment, cmd_create, cmd_ls, cmd_set, cmd_show, cmd_status,
};
pub use tui::cmd_tui;

use std::sync::Arc;

use serde_json::Value;

use crate::config::{Config, SyncConfig};
use crate::display::format_toast;
use crate::error::{DeskError, Result};
use crate::remote::{HostedService, InMemoryService, RemoteDataService};
use crate::session::SessionStore;
use crate::tickets::TicketStore;
use crate::toast::Toaster;
use crate::types::{Ticket, User};

/// Command result that can print as text or JSON
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, output_json: bool) -> Result<()> {
        if output_json {
            println!("{}", serde_json::to_string_pretty(&self.json)?);
        } else if let Some(text) = self.text {
            println!("{}", text);
        }
        Ok(())
    }
}

/// Session and ticket stores sharing one backend
pub struct Desk {
    pub session: Arc<SessionStore>,
    pub tickets: Arc<TicketStore>,
    pub toaster: Toaster,
}

impl Desk {
    pub fn new(service: Arc<dyn RemoteDataService>, sync: &SyncConfig) -> Self {
        let toaster = Toaster::new();
        let session = Arc::new(SessionStore::new(Arc::clone(&service), toaster.clone()));
        let tickets = Arc::new(TicketStore::new(
            service,
            session.subscribe(),
            toaster.clone(),
            sync.coalesce_window(),
        ));
        Self {
            session,
            tickets,
            toaster,
        }
    }

    /// Connect to the configured hosted backend
    pub fn hosted() -> Result<Self> {
        let config = Config::load()?;
        let service = HostedService::from_config(&config)?;
        Ok(Self::new(Arc::new(service), &config.sync))
    }

    /// In-process backend seeded with the demo accounts and tickets
    pub fn demo() -> Result<Self> {
        let service = InMemoryService::demo()?;
        Ok(Self::new(Arc::new(service), &SyncConfig::default()))
    }

    /// Load the stored session, if any
    pub async fn current_user(&self) -> Result<Option<User>> {
        self.session.activate().await?;
        Ok(self.session.user())
    }

    pub async fn require_user(&self) -> Result<User> {
        self.current_user().await?.ok_or(DeskError::NotSignedIn)
    }

    pub async fn require_admin(&self, action: &str) -> Result<User> {
        let user = self.require_user().await?;
        if !user.is_admin() {
            tracing::warn!("{} tried to {} without the admin role", user.email, action);
            return Err(DeskError::Forbidden(action.to_string()));
        }
        Ok(user)
    }

    /// Fetch the full ticket list now
    pub async fn load_tickets(&self) -> Result<Vec<Ticket>> {
        self.tickets.refresh().await?;
        Ok(self.tickets.tickets())
    }

    /// Print any toasts the stores raised to stderr
    pub fn flush_toasts(&self) {
        for toast in self.toaster.take_all() {
            eprintln!("{}", format_toast(&toast));
        }
    }

    /// Stop store listeners and report pending toasts
    pub fn close(&self) {
        self.tickets.deactivate();
        self.session.deactivate();
        self.flush_toasts();
    }
}
