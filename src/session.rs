//! Session store: who is signed in.
//!
//! Wraps the backend's auth surface. State is published through a
//! `tokio::sync::watch` channel; views hold a receiver and re-render when it
//! changes. Once activated, a listener task follows the backend's session
//! notifications until the store is deactivated or dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::remote::rows::ProfileRow;
use crate::remote::{
    AuthChange, AuthEvent, AuthUser, Filter, RemoteDataService, Session, Subscription, Table,
    from_row,
};
use crate::toast::Toaster;
use crate::types::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

struct Inner {
    service: Arc<dyn RemoteDataService>,
    toaster: Toaster,
    state: watch::Sender<SessionState>,
    torn_down: AtomicBool,
}

impl Inner {
    /// Apply a state change unless the store has been torn down.
    fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        if self.torn_down.load(Ordering::SeqCst) {
            tracing::debug!("Ignoring session update after teardown");
            return;
        }
        self.state.send_modify(apply);
    }

    fn set_user(&self, user: Option<User>) {
        self.update(|state| {
            state.user = user;
            state.loading = false;
        });
    }

    fn set_loading(&self) {
        self.update(|state| state.loading = true);
    }

    async fn resolve_profile(&self, identity: &AuthUser) -> Result<User> {
        match self
            .service
            .query_one(Table::Profiles, &Filter::eq("id", identity.id.as_str()))
            .await
        {
            Ok(row) => Ok(from_row::<ProfileRow>(row)?.into_user(identity)),
            Err(e) if e.is_not_found() => {
                tracing::debug!("No profile row for {}, using defaults", identity.email);
                Ok(User::default_for(identity.id.clone(), identity.email.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve and publish the user for a known session.
    async fn adopt_session(&self, session: &Session) -> Result<User> {
        self.set_loading();
        match self.resolve_profile(&session.user).await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::error!("Failed to fetch profile for {}: {}", session.user.email, e);
                self.toaster.error("Failed to fetch user profile");
                self.set_user(None);
                Err(e)
            }
        }
    }

    async fn handle_change(&self, change: AuthChange) {
        match (change.event, change.session) {
            (AuthEvent::SignedIn, Some(session)) => {
                tracing::debug!("Session signed in: {}", session.user.email);
                let _ = self.adopt_session(&session).await;
            }
            (AuthEvent::SignedIn, None) => {
                tracing::warn!("Sign-in notification without a session, ignoring");
            }
            (AuthEvent::SignedOut, _) => {
                tracing::debug!("Session signed out");
                self.set_user(None);
            }
        }
    }
}

async fn listen(inner: Arc<Inner>, mut changes: Subscription<AuthChange>) {
    while let Some(change) = changes.recv().await {
        inner.handle_change(change).await;
    }
    tracing::debug!("Session notifications closed");
}

/// Current user plus login/logout
pub struct SessionStore {
    inner: Arc<Inner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    pub fn new(service: Arc<dyn RemoteDataService>, toaster: Toaster) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                toaster,
                state: watch::channel(SessionState::default()).0,
                torn_down: AtomicBool::new(false),
            }),
            listener: Mutex::new(None),
        }
    }

    /// Start following session changes and load the current session.
    ///
    /// Calling this more than once only reloads the session.
    pub async fn activate(&self) -> Result<()> {
        {
            let mut listener = self.listener.lock();
            if listener.is_none() {
                let changes = self.inner.service.on_session_change();
                *listener = Some(tokio::spawn(listen(Arc::clone(&self.inner), changes)));
            }
        }

        self.inner.set_loading();
        match self.inner.service.get_session().await {
            Ok(Some(session)) => {
                self.inner.adopt_session(&session).await?;
            }
            Ok(None) => self.inner.set_user(None),
            Err(e) => {
                tracing::error!("Failed to load session: {}", e);
                self.inner.set_user(None);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Stop listening. Later notifications and in-flight results are ignored.
    pub fn deactivate(&self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let session = match self.inner.service.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", email.trim(), e);
                self.inner.toaster.error(e.to_string());
                return Err(e);
            }
        };

        let user = self.inner.adopt_session(&session).await?;
        self.inner.toaster.success("Welcome back!");
        Ok(user)
    }

    /// Sign out. Succeeds when nobody is signed in.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.inner.service.sign_out().await {
            tracing::warn!("Logout failed: {}", e);
            self.inner.toaster.error(e.to_string());
            return Err(e);
        }
        self.inner.set_user(None);
        self.inner.toaster.success("Logged out successfully");
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn toaster(&self) -> &Toaster {
        &self.inner.toaster
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryService;
    use crate::types::Role;
    use std::time::Duration;

    async fn settle(store: &SessionStore) -> SessionState {
        let mut rx = store.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.loading))
            .await
            .expect("session never settled")
            .unwrap()
            .clone();
        state
    }

    #[test]
    fn test_initial_state_is_loading() {
        let state = SessionState::default();
        assert!(state.loading);
        assert!(state.user.is_none());
    }

    #[tokio::test]
    async fn test_activate_without_session() {
        let service = Arc::new(InMemoryService::new());
        let store = SessionStore::new(service, Toaster::new());
        store.activate().await.unwrap();
        let state = settle(&store).await;
        assert!(state.user.is_none());
    }

    #[tokio::test]
    async fn test_activate_restores_existing_session() {
        let service = Arc::new(InMemoryService::new());
        service.register_with_profile("ada@example.com", "pw", "Ada", Role::Admin);
        service.sign_in("ada@example.com", "pw").await.unwrap();

        let store = SessionStore::new(service, Toaster::new());
        store.activate().await.unwrap();
        let user = store.user().unwrap();
        assert_eq!(user.name, "Ada");
        assert!(user.is_admin());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_activate_offline_clears_loading() {
        let service = Arc::new(InMemoryService::new());
        service.set_offline(true);
        let store = SessionStore::new(service, Toaster::new());
        assert!(store.activate().await.is_err());
        assert!(!store.is_loading());
        assert!(store.user().is_none());
    }

    #[tokio::test]
    async fn test_updates_ignored_after_deactivate() {
        let service = Arc::new(InMemoryService::new());
        service.register("sam@example.com", "pw");
        let store = SessionStore::new(service.clone(), Toaster::new());
        store.activate().await.unwrap();
        store.deactivate();

        service.sign_in("sam@example.com", "pw").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.user().is_none());
    }
}
