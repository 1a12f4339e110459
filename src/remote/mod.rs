//! Remote data service contract.
//!
//! Everything the desk persists lives in a hosted backend that provides
//! password authentication, a small relational row store, and change
//! notifications for its tables. This module defines that contract as the
//! [`RemoteDataService`] trait plus the value types that cross it.
//!
//! Two implementations ship with the crate:
//! - [`hosted::HostedService`] talks to a REST auth + row API over HTTP
//! - [`memory::InMemoryService`] keeps everything in process (tests, demo mode)

pub mod error;
pub mod hosted;
pub mod memory;
pub mod rows;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use secrecy::{ExposeSecret, SecretBox};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::error::Result;

pub use hosted::HostedService;
pub use memory::InMemoryService;

/// A single row as it travels over the wire
pub type Row = Map<String, Value>;

/// Tables exposed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Tickets,
    Comments,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Profiles, Table::Tickets, Table::Comments];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Tickets => "tickets",
            Table::Comments => "comments",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filter over row columns. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_eq(column, value)
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }

    /// Query-string pairs in `column=eq.value` form.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.conditions
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", render_value(value))))
            .collect()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return f.write_str("*");
        }
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|(column, value)| format!("{}=eq.{}", column, render_value(value)))
            .collect();
        f.write_str(&parts.join("&"))
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Sort order for multi-row queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    pub fn to_query_value(&self) -> String {
        let direction = if self.ascending { "asc" } else { "desc" };
        format!("{}.{}", self.column, direction)
    }
}

/// Identity attached to a session by the auth subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// An authenticated session returned by the backend.
#[derive(Clone)]
pub struct Session {
    pub user: AuthUser,
    access_token: Arc<SecretBox<String>>,
    pub expires_at: Option<Timestamp>,
}

impl Session {
    pub fn new(user: AuthUser, access_token: String, expires_at: Option<Timestamp>) -> Self {
        Self {
            user,
            access_token: Arc::new(SecretBox::new(Box::new(access_token))),
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| expires_at <= Timestamp::now())
            .unwrap_or(false)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
}

/// Session-change notification
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// A change was observed but its kind is unknown (e.g. detected by polling)
    Detected,
}

/// Table-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableChange {
    pub table: Table,
    pub kind: ChangeKind,
}

/// A live notification stream. Dropping it unsubscribes.
pub struct Subscription<T: Clone> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub fn new(receiver: broadcast::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Wait for the next notification. Returns `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("subscription lagged, skipped {skipped} notifications");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Discard every notification already queued, returning how many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(_) => drained += 1,
                Err(TryRecvError::Lagged(skipped)) => drained += skipped as usize,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return drained,
            }
        }
    }
}

/// Contract of the hosted backend consumed by the session and ticket stores
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// The current session, if someone is signed in
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Subscribe to sign-in / sign-out notifications
    fn on_session_change(&self) -> Subscription<AuthChange>;

    /// Check credentials and open a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Close the current session. Succeeds when no one is signed in.
    async fn sign_out(&self) -> Result<()>;

    /// Fetch exactly one row, or `RecordNotFound`
    async fn query_one(&self, table: Table, filter: &Filter) -> Result<Row>;

    /// Fetch every row matching `filter`, optionally sorted
    async fn query_many(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>>;

    /// Insert a row. The backend assigns `id` and `created_at`.
    async fn insert(&self, table: Table, row: Row) -> Result<()>;

    /// Apply `patch` to every row matching `filter`
    async fn update(&self, table: Table, filter: &Filter, patch: Row) -> Result<()>;

    /// Subscribe to insert/update/delete notifications for `table`
    fn on_table_change(&self, table: Table) -> Subscription<TableChange>;
}

/// Serialize a value into a wire row
pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(crate::error::DeskError::Other(format!(
            "expected an object row, got {other}"
        ))),
    }
}

/// Deserialize a wire row into a typed value
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_matches() {
        let r = row(json!({"id": "t1", "status": "open"}));
        assert!(Filter::all().matches(&r));
        assert!(Filter::eq("id", "t1").matches(&r));
        assert!(!Filter::eq("id", "t1").and_eq("status", "resolved").matches(&r));
        assert!(!Filter::eq("missing", "x").matches(&r));
    }

    #[test]
    fn test_filter_query_pairs_and_display() {
        let filter = Filter::eq("id", "t1").and_eq("count", 3);
        assert_eq!(
            filter.to_query_pairs(),
            vec![
                ("id".to_string(), "eq.t1".to_string()),
                ("count".to_string(), "eq.3".to_string())
            ]
        );
        assert_eq!(filter.to_string(), "id=eq.t1&count=eq.3");
        assert_eq!(Filter::all().to_string(), "*");
    }

    #[test]
    fn test_order_query_value() {
        assert_eq!(OrderBy::desc("created_at").to_query_value(), "created_at.desc");
        assert_eq!(OrderBy::asc("created_at").to_query_value(), "created_at.asc");
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::new(
            AuthUser {
                id: "u1".to_string(),
                email: "a@b.c".to_string(),
            },
            "super-secret-token".to_string(),
            None,
        );
        let debug = format!("{:?}", session);
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(session.access_token(), "super-secret-token");
        assert!(!session.is_expired());
    }

    #[test]
    fn test_session_expiry() {
        let past = Timestamp::now()
            .checked_sub(jiff::SignedDuration::from_secs(60))
            .unwrap();
        let session = Session::new(
            AuthUser {
                id: "u1".to_string(),
                email: "a@b.c".to_string(),
            },
            "t".to_string(),
            Some(past),
        );
        assert!(session.is_expired());
    }

    #[tokio::test]
    async fn test_subscription_drain_and_close() {
        let (tx, rx) = broadcast::channel(8);
        let mut sub = Subscription::new(rx);
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        tx.send(3).unwrap();
        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.drain(), 2);
        drop(tx);
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_row_roundtrip_rejects_non_objects() {
        assert!(to_row(&42).is_err());
        let r = to_row(&json!({"a": 1})).unwrap();
        let v: Value = from_row(r).unwrap();
        assert_eq!(v, json!({"a": 1}));
    }
}
