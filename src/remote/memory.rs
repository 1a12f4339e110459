//! In-process implementation of the remote data service.
//!
//! Behaves like the hosted backend as far as the stores can observe:
//! it owns identities and sessions, assigns `id` and `created_at` on insert,
//! rejects comments that point at a missing ticket, and broadcasts a change
//! notification after every write. Used by the test suite and by demo mode.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use super::{
    AuthChange, AuthUser, ChangeKind, Filter, OrderBy, RemoteDataService, Row, Session,
    Subscription, Table, TableChange,
};
use crate::error::{DeskError, Result};
use crate::types::Role;

const CHANNEL_CAPACITY: usize = 64;
const SESSION_LIFETIME: SignedDuration = SignedDuration::from_hours(1);

/// Columns that must be present (and non-null) on insert
fn required_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Profiles => &["id", "email"],
        Table::Tickets => &["title", "user_id"],
        Table::Comments => &["ticket_id", "content", "user_id"],
    }
}

/// Column defaults applied on insert when the client omits them
fn column_defaults(table: Table) -> &'static [(&'static str, &'static str)] {
    match table {
        Table::Tickets => &[("status", "open"), ("priority", "medium"), ("description", "")],
        Table::Profiles => &[("role", "user")],
        Table::Comments => &[],
    }
}

struct Account {
    id: String,
    email: String,
    password_digest: blake3::Hash,
}

#[derive(Default)]
struct Inner {
    /// Accounts keyed by lowercase email
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    tables: HashMap<Table, Vec<Row>>,
    last_created_at: Option<Timestamp>,
}

impl Inner {
    fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Row> {
        self.tables.entry(table).or_default()
    }

    /// Strictly increasing creation timestamps, even within one clock tick.
    fn next_created_at(&mut self) -> Result<Timestamp> {
        let now = Timestamp::now();
        let next = match self.last_created_at {
            Some(last) if now <= last => last
                .checked_add(SignedDuration::from_micros(1))
                .map_err(|e| DeskError::Other(format!("timestamp overflow: {e}")))?,
            _ => now,
        };
        self.last_created_at = Some(next);
        Ok(next)
    }
}

/// In-memory backend
pub struct InMemoryService {
    inner: Mutex<Inner>,
    auth_events: broadcast::Sender<AuthChange>,
    table_events: HashMap<Table, broadcast::Sender<TableChange>>,
    offline: AtomicBool,
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn password_digest(email: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(email.as_bytes());
    hasher.update(b"\0");
    hasher.update(password.as_bytes());
    hasher.finalize()
}

impl InMemoryService {
    pub fn new() -> Self {
        let (auth_events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let table_events = Table::ALL
            .iter()
            .map(|table| (*table, broadcast::channel(CHANNEL_CAPACITY).0))
            .collect();
        Self {
            inner: Mutex::new(Inner::default()),
            auth_events,
            table_events,
            offline: AtomicBool::new(false),
        }
    }

    /// A backend pre-populated with the demo accounts and a few tickets.
    ///
    /// - `user@example.com` / `password123` (role: user)
    /// - `admin@example.com` / `admin123` (role: admin)
    pub fn demo() -> Result<Self> {
        let service = Self::new();
        let user_id =
            service.register_with_profile("user@example.com", "password123", "Demo User", Role::User);
        let admin_id =
            service.register_with_profile("admin@example.com", "admin123", "Admin", Role::Admin);

        let tickets = [
            ("Cannot connect to VPN", "The client times out after the MFA prompt.", "high", "open"),
            ("Request a second monitor", "For the new desk in room 4.", "low", "in-progress"),
            ("Password reset email never arrives", "Checked spam too.", "medium", "resolved"),
        ];
        for (title, description, priority, status) in tickets {
            service.insert_row(
                Table::Tickets,
                json_row(json!({
                    "title": title,
                    "description": description,
                    "priority": priority,
                    "status": status,
                    "user_id": user_id,
                })),
            )?;
        }

        let first = service
            .rows(Table::Tickets)
            .into_iter()
            .find(|row| row.get("title") == Some(&json!("Cannot connect to VPN")))
            .and_then(|row| row.get("id").cloned());
        if let Some(ticket_id) = first {
            service.insert_row(
                Table::Comments,
                json_row(json!({
                    "ticket_id": ticket_id,
                    "content": "Which client version are you running?",
                    "user_id": admin_id,
                })),
            )?;
        }

        Ok(service)
    }

    /// Create an auth identity without a profile row. Returns the user id.
    pub fn register(&self, email: &str, password: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let key = email.trim().to_lowercase();
        let account = Account {
            id: id.clone(),
            email: email.trim().to_string(),
            password_digest: password_digest(&key, password),
        };
        self.inner.lock().accounts.insert(key, account);
        id
    }

    /// Create an auth identity together with its profile row. Returns the user id.
    pub fn register_with_profile(&self, email: &str, password: &str, name: &str, role: Role) -> String {
        let id = self.register(email, password);
        self.seed(
            Table::Profiles,
            json_row(json!({
                "id": id,
                "email": email.trim(),
                "name": name,
                "role": role.to_string(),
            })),
        );
        id
    }

    /// Administrative insert: stores the row exactly as given (no id or
    /// timestamp assignment, no constraint checks) and notifies subscribers.
    pub fn seed(&self, table: Table, row: Row) {
        self.inner.lock().rows_mut(table).push(row);
        self.notify(table, ChangeKind::Insert);
    }

    /// Administrative delete of every row matching `filter`.
    pub fn delete(&self, table: Table, filter: &Filter) -> usize {
        let removed = {
            let mut inner = self.inner.lock();
            let rows = inner.rows_mut(table);
            let before = rows.len();
            rows.retain(|row| !filter.matches(row));
            before - rows.len()
        };
        if removed > 0 {
            self.notify(table, ChangeKind::Delete);
        }
        removed
    }

    /// Snapshot of a table's rows in insertion order
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.inner.lock().rows(table).to_vec()
    }

    /// Make every subsequent call fail with a network error (or recover).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Terminate the current session from the backend side.
    pub fn expire_session(&self) {
        let had_session = self.inner.lock().session.take().is_some();
        if had_session {
            let _ = self.auth_events.send(AuthChange::signed_out());
        }
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(DeskError::Network("backend unreachable".to_string()));
        }
        Ok(())
    }

    fn notify(&self, table: Table, kind: ChangeKind) {
        if let Some(sender) = self.table_events.get(&table) {
            // No subscribers is fine
            let _ = sender.send(TableChange { table, kind });
        }
    }

    fn insert_row(&self, table: Table, mut row: Row) -> Result<()> {
        {
            let mut inner = self.inner.lock();

            for (column, default) in column_defaults(table) {
                if row.get(*column).is_none_or(Value::is_null) {
                    row.insert(column.to_string(), Value::String(default.to_string()));
                }
            }
            for column in required_columns(table) {
                if row.get(*column).is_none_or(Value::is_null) {
                    return Err(DeskError::Api(format!(
                        "null value in column \"{column}\" of relation \"{table}\" violates not-null constraint"
                    )));
                }
            }

            if table == Table::Comments {
                let ticket_id = row.get("ticket_id").cloned().unwrap_or(Value::Null);
                let exists = inner
                    .rows(Table::Tickets)
                    .iter()
                    .any(|t| t.get("id") == Some(&ticket_id));
                if !exists {
                    return Err(DeskError::Api(
                        "insert or update on table \"comments\" violates foreign key constraint \"comments_ticket_id_fkey\"".to_string(),
                    ));
                }
            }

            if table != Table::Profiles {
                row.insert(
                    "id".to_string(),
                    Value::String(uuid::Uuid::new_v4().to_string()),
                );
            } else if inner
                .rows(Table::Profiles)
                .iter()
                .any(|p| p.get("id") == row.get("id"))
            {
                return Err(DeskError::Api(
                    "duplicate key value violates unique constraint \"profiles_pkey\"".to_string(),
                ));
            }
            let created_at = inner.next_created_at()?;
            row.insert(
                "created_at".to_string(),
                Value::String(created_at.to_string()),
            );

            inner.rows_mut(table).push(row);
        }
        self.notify(table, ChangeKind::Insert);
        Ok(())
    }
}

fn json_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Order two column values: timestamps chronologically, numbers numerically,
/// everything else by string form. Missing values sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (a.parse::<Timestamp>(), b.parse::<Timestamp>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl RemoteDataService for InMemoryService {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.ensure_online()?;
        let inner = self.inner.lock();
        Ok(inner.session.clone().filter(|s| !s.is_expired()))
    }

    fn on_session_change(&self) -> Subscription<AuthChange> {
        Subscription::new(self.auth_events.subscribe())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.ensure_online()?;
        let key = email.trim().to_lowercase();
        let session = {
            let mut inner = self.inner.lock();
            let account = inner
                .accounts
                .get(&key)
                .filter(|a| a.password_digest == password_digest(&key, password))
                .ok_or_else(|| DeskError::Auth("Invalid login credentials".to_string()))?;
            let session = Session::new(
                AuthUser {
                    id: account.id.clone(),
                    email: account.email.clone(),
                },
                uuid::Uuid::new_v4().to_string(),
                Timestamp::now().checked_add(SESSION_LIFETIME).ok(),
            );
            inner.session = Some(session.clone());
            session
        };
        let _ = self.auth_events.send(AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.ensure_online()?;
        self.expire_session();
        Ok(())
    }

    async fn query_one(&self, table: Table, filter: &Filter) -> Result<Row> {
        self.ensure_online()?;
        let inner = self.inner.lock();
        inner
            .rows(table)
            .iter()
            .find(|row| filter.matches(row))
            .cloned()
            .ok_or_else(|| DeskError::RecordNotFound {
                table: table.to_string(),
                filter: filter.to_string(),
            })
    }

    async fn query_many(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>> {
        self.ensure_online()?;
        let mut rows: Vec<Row> = {
            let inner = self.inner.lock();
            inner
                .rows(table)
                .iter()
                .filter(|row| filter.matches(row))
                .cloned()
                .collect()
        };
        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<()> {
        self.ensure_online()?;
        self.insert_row(table, row)
    }

    async fn update(&self, table: Table, filter: &Filter, patch: Row) -> Result<()> {
        self.ensure_online()?;
        let updated = {
            let mut inner = self.inner.lock();
            let mut updated = 0;
            for row in inner.rows_mut(table).iter_mut() {
                if !filter.matches(row) {
                    continue;
                }
                for (column, value) in &patch {
                    if column == "id" || column == "created_at" {
                        continue;
                    }
                    row.insert(column.clone(), value.clone());
                }
                updated += 1;
            }
            updated
        };
        if updated > 0 {
            self.notify(table, ChangeKind::Update);
        }
        Ok(())
    }

    fn on_table_change(&self, table: Table) -> Subscription<TableChange> {
        let receiver = match self.table_events.get(&table) {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        };
        Subscription::new(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let service = InMemoryService::new();
        service.register("Pat@Example.com", "hunter2");

        assert!(matches!(
            service.sign_in("pat@example.com", "wrong").await,
            Err(DeskError::Auth(_))
        ));
        let session = service.sign_in("pat@example.com", "hunter2").await.unwrap();
        assert_eq!(session.user.email, "Pat@Example.com");
        assert!(service.get_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_ok() {
        let service = InMemoryService::new();
        let mut events = service.on_session_change();
        service.sign_out().await.unwrap();
        assert_eq!(events.drain(), 0);
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_increasing_created_at() {
        let service = InMemoryService::new();
        for title in ["a", "b", "c"] {
            service
                .insert(
                    Table::Tickets,
                    json_row(json!({"title": title, "user_id": "u1", "id": "client", "created_at": "1999-01-01T00:00:00Z"})),
                )
                .await
                .unwrap();
        }
        let rows = service.rows(Table::Tickets);
        let stamps: Vec<Timestamp> = rows
            .iter()
            .map(|r| r["created_at"].as_str().unwrap().parse().unwrap())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        assert!(rows.iter().all(|r| r["id"] != json!("client")));
        assert!(rows.iter().all(|r| r["status"] == json!("open")));
    }

    #[tokio::test]
    async fn test_comment_requires_existing_ticket() {
        let service = InMemoryService::new();
        let err = service
            .insert(
                Table::Comments,
                json_row(json!({"ticket_id": "nope", "content": "hi", "user_id": "u1"})),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("foreign key"));
    }

    #[tokio::test]
    async fn test_missing_required_column() {
        let service = InMemoryService::new();
        let err = service
            .insert(Table::Tickets, json_row(json!({"title": "no owner"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[tokio::test]
    async fn test_query_one_not_found() {
        let service = InMemoryService::new();
        let err = service
            .query_one(Table::Profiles, &Filter::eq("id", "ghost"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_query_many_orders_by_timestamp() {
        let service = InMemoryService::new();
        service.seed(
            Table::Tickets,
            json_row(json!({"id": "early", "created_at": "2024-01-01T00:00:00.5Z"})),
        );
        service.seed(
            Table::Tickets,
            json_row(json!({"id": "late", "created_at": "2024-01-01T00:00:01Z"})),
        );
        let rows = service
            .query_many(Table::Tickets, &Filter::all(), Some(&OrderBy::desc("created_at")))
            .await
            .unwrap();
        assert_eq!(rows[0]["id"], json!("late"));
        assert_eq!(rows[1]["id"], json!("early"));
    }

    #[tokio::test]
    async fn test_update_keeps_identity_columns() {
        let service = InMemoryService::new();
        service.seed(
            Table::Tickets,
            json_row(json!({"id": "t1", "status": "open", "created_at": "2024-01-01T00:00:00Z"})),
        );
        let mut changes = service.on_table_change(Table::Tickets);
        service
            .update(
                Table::Tickets,
                &Filter::eq("id", "t1"),
                json_row(json!({"status": "resolved", "id": "t9"})),
            )
            .await
            .unwrap();
        let row = &service.rows(Table::Tickets)[0];
        assert_eq!(row["status"], json!("resolved"));
        assert_eq!(row["id"], json!("t1"));
        assert_eq!(
            changes.recv().await,
            Some(TableChange {
                table: Table::Tickets,
                kind: ChangeKind::Update
            })
        );
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let service = InMemoryService::new();
        service.set_offline(true);
        assert!(matches!(
            service.get_session().await,
            Err(DeskError::Network(_))
        ));
        service.set_offline(false);
        assert!(service.get_session().await.unwrap().is_none());
    }

    #[test]
    fn test_demo_data() {
        let service = InMemoryService::demo().unwrap();
        assert_eq!(service.rows(Table::Profiles).len(), 2);
        assert_eq!(service.rows(Table::Tickets).len(), 3);
        assert_eq!(service.rows(Table::Comments).len(), 1);
    }
}
