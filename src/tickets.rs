//! Ticket store: the ticket list and the mutations on it.
//!
//! The list is always re-fetched in full from the backend; mutations are
//! never applied locally. After a write the list stays stale until the
//! change notification arrives and the re-fetch completes.
//!
//! Bursts of notifications are coalesced: after the first one the listener
//! waits a short window, drains whatever else arrived, then fetches once.
//! Every fetch takes a sequence number and only publishes if no later fetch
//! has published already, so a slow response cannot overwrite a newer list.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::remote::rows::{CommentRow, NewCommentRow, TicketRow, assemble_tickets, parse_rows};
use crate::remote::{
    Filter, OrderBy, RemoteDataService, Subscription, Table, TableChange, to_row,
};
use crate::session::SessionState;
use crate::toast::Toaster;
use crate::types::{NewTicket, Ticket, TicketPatch, TicketStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketState {
    pub tickets: Vec<Ticket>,
    pub loading: bool,
    /// Sequence number of the fetch that produced `tickets`
    pub revision: u64,
}

impl Default for TicketState {
    fn default() -> Self {
        Self {
            tickets: Vec::new(),
            loading: true,
            revision: 0,
        }
    }
}

struct Inner {
    service: Arc<dyn RemoteDataService>,
    toaster: Toaster,
    session: watch::Receiver<SessionState>,
    state: watch::Sender<TicketState>,
    fetch_seq: AtomicU64,
    torn_down: AtomicBool,
    coalesce: Duration,
}

impl Inner {
    fn next_seq(&self) -> u64 {
        self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish the outcome of fetch `seq`. `None` leaves the list untouched.
    fn publish(&self, seq: u64, tickets: Option<Vec<Ticket>>) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }
        self.state.send_if_modified(|state| {
            if seq <= state.revision {
                tracing::debug!(
                    "Discarding stale fetch {} (already at {})",
                    seq,
                    state.revision
                );
                return false;
            }
            if let Some(tickets) = tickets {
                state.tickets = tickets;
            }
            state.loading = false;
            state.revision = seq;
            true
        });
    }

    fn clear(&self) {
        let seq = self.next_seq();
        self.publish(seq, Some(Vec::new()));
    }

    async fn fetch(&self) -> Result<Vec<Ticket>> {
        let ticket_order = OrderBy::desc("created_at");
        let comment_order = OrderBy::asc("created_at");
        let all = Filter::all();
        let (tickets, comments) = futures::try_join!(
            self.service
                .query_many(Table::Tickets, &all, Some(&ticket_order)),
            self.service
                .query_many(Table::Comments, &all, Some(&comment_order)),
        )?;

        let tickets: Vec<TicketRow> = parse_rows(Table::Tickets.as_str(), tickets);
        let comments: Vec<CommentRow> = parse_rows(Table::Comments.as_str(), comments);
        Ok(assemble_tickets(tickets, comments))
    }

    async fn refresh(&self) -> Result<()> {
        let seq = self.next_seq();
        if self.session.borrow().user.is_none() {
            tracing::debug!("No signed-in user, skipping ticket fetch");
            self.publish(seq, None);
            return Ok(());
        }

        match self.fetch().await {
            Ok(tickets) => {
                tracing::debug!("Fetched {} tickets (fetch {})", tickets.len(), seq);
                self.publish(seq, Some(tickets));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error fetching tickets: {}", e);
                self.toaster.error("Error fetching tickets");
                self.publish(seq, None);
                Err(e)
            }
        }
    }
}

fn signed_in_user_id(session: &SessionState) -> Option<String> {
    session.user.as_ref().map(|user| user.id.clone())
}

/// Follow table and session changes. `current_user` is the user seen when
/// `session` was last marked as read; any later sign-in wakes the loop.
async fn listen(
    inner: Arc<Inner>,
    mut ticket_changes: Subscription<TableChange>,
    mut comment_changes: Subscription<TableChange>,
    mut session: watch::Receiver<SessionState>,
    mut current_user: Option<String>,
) {
    let mut session_open = true;

    loop {
        tokio::select! {
            change = ticket_changes.recv() => {
                let Some(change) = change else { break };
                tracing::debug!("{:?} on {}", change.kind, change.table);
            }
            change = comment_changes.recv() => {
                let Some(change) = change else { break };
                tracing::debug!("{:?} on {}", change.kind, change.table);
            }
            changed = session.changed(), if session_open => {
                if changed.is_err() {
                    session_open = false;
                    continue;
                }
                let user = signed_in_user_id(&session.borrow_and_update());
                if user == current_user {
                    continue;
                }
                current_user = user;
                if current_user.is_none() {
                    inner.clear();
                    continue;
                }
            }
        }

        if !inner.coalesce.is_zero() {
            tokio::time::sleep(inner.coalesce).await;
        }
        let coalesced = ticket_changes.drain() + comment_changes.drain();
        if coalesced > 0 {
            tracing::debug!("Coalesced {} change notifications", coalesced);
        }
        let _ = inner.refresh().await;
    }
    tracing::debug!("Ticket change notifications closed");
}

/// Ticket list plus create/update/comment
pub struct TicketStore {
    inner: Arc<Inner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl TicketStore {
    pub fn new(
        service: Arc<dyn RemoteDataService>,
        session: watch::Receiver<SessionState>,
        toaster: Toaster,
        coalesce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                toaster,
                session,
                state: watch::channel(TicketState::default()).0,
                fetch_seq: AtomicU64::new(0),
                torn_down: AtomicBool::new(false),
                coalesce,
            }),
            listener: Mutex::new(None),
        }
    }

    /// Subscribe to change notifications and load the list.
    pub async fn activate(&self) -> Result<()> {
        {
            let mut listener = self.listener.lock();
            if listener.is_none() {
                let tickets = self.inner.service.on_table_change(Table::Tickets);
                let comments = self.inner.service.on_table_change(Table::Comments);
                // Baseline must be taken before the spawn: a sign-in landing
                // before the task first runs has to register as a change
                let mut session = self.inner.session.clone();
                let baseline = signed_in_user_id(&session.borrow_and_update());
                *listener = Some(tokio::spawn(listen(
                    Arc::clone(&self.inner),
                    tickets,
                    comments,
                    session,
                    baseline,
                )));
            }
        }
        self.refresh().await
    }

    pub fn deactivate(&self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }

    /// Re-fetch the full list now.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.refresh().await
    }

    pub async fn create_ticket(&self, ticket: NewTicket) -> Result<()> {
        let result = async {
            let row = to_row(&ticket)?;
            self.inner.service.insert(Table::Tickets, row).await
        }
        .await;
        self.report(result, "Ticket created successfully", "Error creating ticket")
    }

    /// Apply a partial update. An empty patch is a no-op.
    pub async fn update_ticket(&self, ticket_id: &str, patch: TicketPatch) -> Result<()> {
        if patch.is_empty() {
            tracing::debug!("Empty patch for ticket {}, nothing to update", ticket_id);
            return Ok(());
        }
        let result = async {
            let row = to_row(&patch)?;
            self.inner
                .service
                .update(Table::Tickets, &Filter::eq("id", ticket_id), row)
                .await
        }
        .await;
        self.report(result, "Ticket updated successfully", "Error updating ticket")
    }

    pub async fn set_status(&self, ticket_id: &str, status: TicketStatus) -> Result<()> {
        self.update_ticket(ticket_id, TicketPatch::status(status))
            .await
    }

    pub async fn add_comment(&self, ticket_id: &str, content: &str, user_id: &str) -> Result<()> {
        let result = async {
            let row = to_row(&NewCommentRow {
                ticket_id,
                content,
                user_id,
            })?;
            self.inner.service.insert(Table::Comments, row).await
        }
        .await;
        self.report(result, "Comment added successfully", "Error adding comment")
    }

    fn report(&self, result: Result<()>, success: &str, failure: &str) -> Result<()> {
        match result {
            Ok(()) => {
                self.inner.toaster.success(success);
                Ok(())
            }
            Err(e) => {
                tracing::error!("{}: {}", failure, e);
                self.inner.toaster.error(failure);
                Err(e)
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TicketState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> TicketState {
        self.inner.state.borrow().clone()
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.inner.state.borrow().tickets.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn get(&self, ticket_id: &str) -> Option<Ticket> {
        self.inner
            .state
            .borrow()
            .tickets
            .iter()
            .find(|ticket| ticket.id == ticket_id)
            .cloned()
    }
}

impl Drop for TicketStore {
    fn drop(&mut self) {
        self.deactivate();
    }
}
