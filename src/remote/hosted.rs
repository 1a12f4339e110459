//! HTTP client for the hosted auth + row backend.
//!
//! # Security Note - Logging
//!
//! The anon key and the session access token travel in the `apikey` and
//! `Authorization` headers. Both header values are marked sensitive, so
//! reqwest's debug output shows them as `Sensitive` instead of their value.
//! The persisted session file is written owner-read/write only.
//!
//! # Change notifications
//!
//! The backend's push transport is not spoken here. Instead each watched
//! table gets a poller that fingerprints the table contents every
//! `sync.poll_interval_ms` and broadcasts when the fingerprint moves. Writes
//! made through this client broadcast immediately, and the poller absorbs the
//! fingerprint change they cause. A poller exits once its last subscriber is
//! gone.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use parking_lot::RwLock;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use url::Url;

use super::error::{ApiError, transport_error};
use super::{
    AuthChange, AuthUser, ChangeKind, Filter, OrderBy, RemoteDataService, Row, Session,
    Subscription, Table, TableChange,
};
use crate::config::Config;
use crate::error::{DeskError, Result};
use crate::paths::session_path;

const CHANNEL_CAPACITY: usize = 64;

/// Session as stored on disk so separate CLI invocations share a login
#[derive(Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<Timestamp>,
    user: PersistedUser,
}

#[derive(Serialize, Deserialize)]
struct PersistedUser {
    id: String,
    email: String,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token().to_string(),
            expires_at: session.expires_at,
            user: PersistedUser {
                id: session.user.id.clone(),
                email: session.user.email.clone(),
            },
        }
    }
}

impl From<PersistedSession> for Session {
    fn from(stored: PersistedSession) -> Self {
        Session::new(
            AuthUser {
                id: stored.user.id,
                email: stored.user.email,
            },
            stored.access_token,
            stored.expires_at,
        )
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Everything a request needs; shared with the table pollers.
struct Transport {
    client: Client,
    base_url: Url,
    api_key: SecretBox<String>,
    session: RwLock<Option<Session>>,
    session_file: PathBuf,
}

impl Transport {
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DeskError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    fn headers(&self) -> Result<HeaderMap> {
        let key = self.api_key.expose_secret();
        let bearer = match self.session.read().as_ref() {
            Some(session) if !session.is_expired() => format!("Bearer {}", session.access_token()),
            _ => format!("Bearer {key}"),
        };

        let mut headers = HeaderMap::new();
        headers.insert("apikey", sensitive_header(key)?);
        headers.insert(header::AUTHORIZATION, sensitive_header(&bearer)?);
        Ok(headers)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        Ok(self.client.request(method, url).headers(self.headers()?))
    }

    /// Send a request. Transport failures are the outer error, HTTP error
    /// statuses the inner one.
    async fn send_checked(
        &self,
        request: RequestBuilder,
    ) -> Result<std::result::Result<Response, ApiError>> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(Ok(response));
        }
        let body = response.text().await.unwrap_or_default();
        Ok(Err(ApiError::from_body(status, &body)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        Ok(self.send_checked(request).await??)
    }

    fn select_url(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&OrderBy>,
        limit: Option<usize>,
    ) -> Result<Url> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (column, condition) in filter.to_query_pairs() {
                query.append_pair(&column, &condition);
            }
            if let Some(order) = order {
                query.append_pair("order", &order.to_query_value());
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    /// Digest of a table's current contents
    async fn fingerprint(&self, table: Table) -> Result<blake3::Hash> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "id.asc");
        let response = self.send(self.request(Method::GET, url)?).await?;
        let body = response.bytes().await.map_err(transport_error)?;
        Ok(blake3::hash(&body))
    }

    fn current_session(&self) -> Option<Session> {
        let session = self.session.read().clone()?;
        if session.is_expired() {
            tracing::debug!("Stored session for {} has expired", session.user.email);
            *self.session.write() = None;
            return None;
        }
        Some(session)
    }

    fn store_session(&self, session: Option<Session>) {
        let result = match &session {
            Some(session) => write_session_file(&self.session_file, session),
            None => remove_session_file(&self.session_file),
        };
        if let Err(e) = result {
            tracing::warn!(
                "Failed to persist session at {}: {}",
                self.session_file.display(),
                e
            );
        }
        *self.session.write() = session;
    }
}

fn sensitive_header(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| DeskError::Config("credential contains invalid header characters".to_string()))?;
    header.set_sensitive(true);
    Ok(header)
}

fn read_session_file(path: &Path) -> Option<Session> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read session at {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<PersistedSession>(&content) {
        Ok(stored) => Some(stored.into()),
        Err(e) => {
            tracing::warn!("Ignoring corrupt session file {}: {}", path.display(), e);
            None
        }
    }
}

fn write_session_file(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&PersistedSession::from(session))?;
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn remove_session_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Broadcast channel for one table plus the state of its poller
struct ChangeFeed {
    table: Table,
    sender: broadcast::Sender<TableChange>,
    polling: AtomicBool,
    /// Set by our own writes, cleared by the next fingerprint
    local_write: AtomicBool,
}

impl ChangeFeed {
    fn new(table: Table) -> Self {
        Self {
            table,
            sender: broadcast::channel(CHANNEL_CAPACITY).0,
            polling: AtomicBool::new(false),
            local_write: AtomicBool::new(false),
        }
    }

    fn publish(&self, kind: ChangeKind) {
        let _ = self.sender.send(TableChange {
            table: self.table,
            kind,
        });
    }

    /// Announce a write made through this client.
    fn publish_local(&self, kind: ChangeKind) {
        self.local_write.store(true, Ordering::SeqCst);
        self.publish(kind);
    }

    /// Record a new fingerprint. Returns whether it reveals a change that has
    /// not been announced yet.
    fn observe(&self, last: &mut Option<blake3::Hash>, current: blake3::Hash) -> bool {
        let announced = self.local_write.swap(false, Ordering::SeqCst);
        let moved = last.is_some_and(|previous| previous != current);
        *last = Some(current);
        moved && !announced
    }

    /// Start the poller unless one is already running.
    fn ensure_polling(self: &Arc<Self>, transport: &Arc<Transport>, interval: Duration) {
        if self.polling.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available; {} changes will not be polled", self.table);
            self.polling.store(false, Ordering::SeqCst);
            return;
        };
        handle.spawn(poll_table(Arc::clone(self), Arc::clone(transport), interval));
    }
}

async fn poll_table(feed: Arc<ChangeFeed>, transport: Arc<Transport>, interval: Duration) {
    tracing::debug!("Polling {} every {:?}", feed.table, interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<blake3::Hash> = None;

    loop {
        ticker.tick().await;

        if feed.sender.receiver_count() == 0 {
            feed.polling.store(false, Ordering::SeqCst);
            // A subscriber may have arrived between the check and the store
            if feed.sender.receiver_count() == 0 || feed.polling.swap(true, Ordering::SeqCst) {
                break;
            }
        }

        match transport.fingerprint(feed.table).await {
            Ok(current) => {
                if feed.observe(&mut last, current) {
                    tracing::debug!("Detected change in {}", feed.table);
                    feed.publish(ChangeKind::Detected);
                }
            }
            Err(e) => tracing::debug!("Polling {} failed: {}", feed.table, e),
        }
    }
    tracing::debug!("Stopped polling {}", feed.table);
}

/// Hosted backend client
pub struct HostedService {
    transport: Arc<Transport>,
    auth_events: broadcast::Sender<AuthChange>,
    feeds: HashMap<Table, Arc<ChangeFeed>>,
    poll_interval: Duration,
}

impl HostedService {
    /// Build a client from configuration (environment overrides applied).
    pub fn from_config(config: &Config) -> Result<Self> {
        let (url, api_key) = config.require_service()?;
        Self::new(
            &url,
            &api_key,
            config.remote_timeout(),
            config.sync.poll_interval(),
            session_path(),
        )
    }

    pub fn new(
        url: &str,
        api_key: &str,
        timeout: Duration,
        poll_interval: Duration,
        session_file: PathBuf,
    ) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/", url.trim_end_matches('/')))
            .map_err(|e| DeskError::Config(format!("invalid service.url '{url}': {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;

        let session = read_session_file(&session_file);
        let transport = Arc::new(Transport {
            client,
            base_url,
            api_key: SecretBox::new(Box::new(api_key.to_string())),
            session: RwLock::new(session),
            session_file,
        });

        let feeds = Table::ALL
            .iter()
            .map(|table| (*table, Arc::new(ChangeFeed::new(*table))))
            .collect();

        Ok(Self {
            transport,
            auth_events: broadcast::channel(CHANNEL_CAPACITY).0,
            feeds,
            poll_interval,
        })
    }

    fn publish_local(&self, table: Table, kind: ChangeKind) {
        if let Some(feed) = self.feeds.get(&table) {
            feed.publish_local(kind);
        }
    }
}

#[async_trait]
impl RemoteDataService for HostedService {
    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.transport.current_session())
    }

    fn on_session_change(&self) -> Subscription<AuthChange> {
        Subscription::new(self.auth_events.subscribe())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let mut url = self.transport.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = serde_json::json!({ "email": email.trim(), "password": password });
        let response = self
            .transport
            .send(self.transport.request(Method::POST, url)?.json(&body))
            .await?;
        let token: TokenResponse = response.json().await.map_err(transport_error)?;

        let expires_at = token
            .expires_in
            .and_then(|secs| Timestamp::now().checked_add(SignedDuration::from_secs(secs)).ok());
        let session = Session::new(
            AuthUser {
                id: token.user.id,
                email: token.user.email.unwrap_or_else(|| email.trim().to_string()),
            },
            token.access_token,
            expires_at,
        );

        self.transport.store_session(Some(session.clone()));
        tracing::debug!("Signed in as {}", session.user.email);
        let _ = self.auth_events.send(AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.transport.session.read().is_none() {
            return Ok(());
        }

        let url = self.transport.endpoint("auth/v1/logout")?;
        match self
            .transport
            .send(self.transport.request(Method::POST, url)?)
            .await
        {
            Ok(_) => {}
            // The token is already dead on the server side
            Err(DeskError::Auth(message)) => {
                tracing::debug!("Server rejected logout token: {message}");
            }
            Err(e) => return Err(e),
        }

        self.transport.store_session(None);
        let _ = self.auth_events.send(AuthChange::signed_out());
        Ok(())
    }

    async fn query_one(&self, table: Table, filter: &Filter) -> Result<Row> {
        let not_found = || DeskError::RecordNotFound {
            table: table.to_string(),
            filter: filter.to_string(),
        };
        let url = self.transport.select_url(table, filter, None, Some(1))?;
        let request = self.transport.request(Method::GET, url)?;
        let response = match self.transport.send_checked(request).await? {
            Ok(response) => response,
            Err(api) if api.is_not_found() => return Err(not_found()),
            Err(api) => return Err(api.into()),
        };
        let rows: Vec<Row> = response.json().await.map_err(transport_error)?;
        rows.into_iter().next().ok_or_else(not_found)
    }

    async fn query_many(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>> {
        let url = self.transport.select_url(table, filter, order, None)?;
        let response = self
            .transport
            .send(self.transport.request(Method::GET, url)?)
            .await?;
        response.json().await.map_err(transport_error)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<()> {
        let url = self.transport.endpoint(&format!("rest/v1/{table}"))?;
        let request = self
            .transport
            .request(Method::POST, url)?
            .header("Prefer", "return=minimal")
            .json(&row);
        self.transport.send(request).await?;
        self.publish_local(table, ChangeKind::Insert);
        Ok(())
    }

    async fn update(&self, table: Table, filter: &Filter, patch: Row) -> Result<()> {
        if filter.is_empty() {
            return Err(DeskError::Other(format!(
                "refusing to update every row of {table} without a filter"
            )));
        }
        let mut url = self.transport.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut query = url.query_pairs_mut();
            for (column, condition) in filter.to_query_pairs() {
                query.append_pair(&column, &condition);
            }
        }
        let request = self
            .transport
            .request(Method::PATCH, url)?
            .header("Prefer", "return=minimal")
            .json(&patch);
        self.transport.send(request).await?;
        self.publish_local(table, ChangeKind::Update);
        Ok(())
    }

    fn on_table_change(&self, table: Table) -> Subscription<TableChange> {
        match self.feeds.get(&table) {
            Some(feed) => {
                let receiver = feed.sender.subscribe();
                feed.ensure_polling(&self.transport, self.poll_interval);
                Subscription::new(receiver)
            }
            None => Subscription::new(broadcast::channel(1).1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> HostedService {
        HostedService::new(
            "http://127.0.0.1:9/",
            "anon-key",
            Duration::from_secs(1),
            Duration::from_secs(60),
            dir.path().join("session.json"),
        )
        .unwrap()
    }

    fn session(expires_at: Option<Timestamp>) -> Session {
        Session::new(
            AuthUser {
                id: "u1".to_string(),
                email: "pat@example.com".to_string(),
            },
            "token-123".to_string(),
            expires_at,
        )
    }

    #[test]
    fn test_local_write_absorbs_next_fingerprint() {
        let feed = ChangeFeed::new(Table::Tickets);
        let mut rx = feed.sender.subscribe();
        let mut last = None;

        assert!(!feed.observe(&mut last, blake3::hash(b"v1")));

        feed.publish_local(ChangeKind::Insert);
        assert_eq!(rx.try_recv().unwrap().kind, ChangeKind::Insert);
        assert!(!feed.observe(&mut last, blake3::hash(b"v2")));

        // A change nobody announced is still detected
        assert!(feed.observe(&mut last, blake3::hash(b"v3")));
        assert!(!feed.observe(&mut last, blake3::hash(b"v3")));
    }

    #[test]
    fn test_endpoints_join_under_base() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let url = service.transport.endpoint("rest/v1/tickets").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/rest/v1/tickets");
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let dir = TempDir::new().unwrap();
        let result = HostedService::new(
            "not a url",
            "k",
            Duration::from_secs(1),
            Duration::from_secs(1),
            dir.path().join("session.json"),
        );
        assert!(matches!(result, Err(DeskError::Config(_))));
    }

    #[test]
    fn test_headers_use_session_token_when_signed_in() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let headers = service.transport.headers().unwrap();
        assert_eq!(headers["authorization"], "Bearer anon-key");
        assert!(headers["apikey"].is_sensitive());

        *service.transport.session.write() = Some(session(None));
        let headers = service.transport.headers().unwrap();
        assert_eq!(headers["authorization"], "Bearer token-123");
        assert_eq!(headers["apikey"], "anon-key");
    }

    #[tokio::test]
    async fn test_session_persists_across_clients() {
        let dir = TempDir::new().unwrap();
        service(&dir).transport.store_session(Some(session(None)));

        let reopened = service(&dir);
        let restored = reopened.get_session().await.unwrap().unwrap();
        assert_eq!(restored.user.email, "pat@example.com");
        assert_eq!(restored.access_token(), "token-123");
    }

    #[tokio::test]
    async fn test_expired_session_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let past = Timestamp::now()
            .checked_sub(SignedDuration::from_secs(5))
            .unwrap();
        service(&dir).transport.store_session(Some(session(Some(past))));

        let reopened = service(&dir);
        assert!(reopened.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_session_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("session.json"), "{not json").unwrap();
        assert!(service(&dir).get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_skips_network() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let mut events = service.on_session_change();
        service.sign_out().await.unwrap();
        assert_eq!(events.drain(), 0);
    }

    #[tokio::test]
    async fn test_update_requires_filter() {
        let dir = TempDir::new().unwrap();
        let result = service(&dir)
            .update(Table::Tickets, &Filter::all(), Row::new())
            .await;
        assert!(matches!(result, Err(DeskError::Other(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        service(&dir).transport.store_session(Some(session(None)));
        let mode = fs::metadata(dir.path().join("session.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
