//! Interactive desk (`ticketdesk tui`)

use super::Desk;
use crate::error::Result;
use crate::logging;

/// Launch the TUI against the hosted backend, or the in-process demo backend
pub async fn cmd_tui(demo: bool) -> Result<()> {
    logging::init_file()?;
    let desk = if demo { Desk::demo()? } else { Desk::hosted()? };
    tracing::info!(demo, "Starting TUI");

    let result = crate::tui::run(desk.session.clone(), desk.tickets.clone(), demo).await;

    // Toasts were already shown on screen
    desk.tickets.deactivate();
    desk.session.deactivate();
    result
}
