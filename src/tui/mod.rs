//! Interactive terminal interface
//!
//! `app` holds the root component; `components` the pieces it is built from.

pub mod app;
pub mod components;
pub mod theme;

use std::sync::Arc;

use iocraft::prelude::*;

use crate::error::{DeskError, Result};
use crate::session::SessionStore;
use crate::tickets::TicketStore;

pub use app::{DeskApp, DeskAppProps};
pub use theme::Theme;

/// Run the TUI until the user quits. Stores are activated by the app.
pub async fn run(session: Arc<SessionStore>, tickets: Arc<TicketStore>, demo: bool) -> Result<()> {
    element!(DeskApp(
        session: Some(session),
        tickets: Some(tickets),
        demo: demo,
    ))
    .fullscreen()
    .await
    .map_err(|e| DeskError::Other(format!("TUI error: {}", e)))
}
