#![allow(dead_code)]

use std::future::Future;
use std::process::{Command, Output};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::watch;

use ticketdesk::remote::Row;
use ticketdesk::{
    InMemoryService, Role, SessionState, SessionStore, TicketState, TicketStore, Toaster,
};

pub const USER_EMAIL: &str = "sam@example.com";
pub const USER_PASSWORD: &str = "hunter22";
pub const ADMIN_EMAIL: &str = "root@example.com";
pub const ADMIN_PASSWORD: &str = "s3cret!";

/// Upper bound for anything that waits on a change notification
pub const WAIT: Duration = Duration::from_secs(5);

/// Runs the `ticketdesk` binary against an isolated desk root
pub struct DeskTest {
    pub temp_dir: TempDir,
}

impl DeskTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        DeskTest { temp_dir }
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ticketdesk"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("TICKETDESK_ROOT", self.temp_dir.path().join(".ticketdesk"))
            .env_remove("TICKETDESK_URL")
            .env_remove("TICKETDESK_API_KEY")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute ticketdesk command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Command {:?} should have failed\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }
}

/// Backend with one regular user and one admin, both with profiles
pub fn service() -> Arc<InMemoryService> {
    let service = Arc::new(InMemoryService::new());
    service.register_with_profile(USER_EMAIL, USER_PASSWORD, "Sam", Role::User);
    service.register_with_profile(ADMIN_EMAIL, ADMIN_PASSWORD, "Root", Role::Admin);
    service
}

/// Stores wired the way the binary wires them, without a coalescing delay
pub struct Harness {
    pub service: Arc<InMemoryService>,
    pub toaster: Toaster,
    pub session: Arc<SessionStore>,
    pub tickets: Arc<TicketStore>,
}

impl Harness {
    pub fn new(service: Arc<InMemoryService>) -> Self {
        let toaster = Toaster::new();
        let session = Arc::new(SessionStore::new(service.clone(), toaster.clone()));
        let tickets = Arc::new(TicketStore::new(
            service.clone(),
            session.subscribe(),
            toaster.clone(),
            Duration::ZERO,
        ));
        Harness {
            service,
            toaster,
            session,
            tickets,
        }
    }

    /// Activate both stores
    pub async fn start(&self) {
        self.session.activate().await.expect("session activate");
        self.tickets.activate().await.expect("tickets activate");
    }

    pub async fn login_user(&self) {
        self.session
            .login(USER_EMAIL, USER_PASSWORD)
            .await
            .expect("user login");
    }

    pub async fn login_admin(&self) {
        self.session
            .login(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("admin login");
    }

    pub async fn wait_for_tickets(&self, pred: impl FnMut(&TicketState) -> bool) -> TicketState {
        wait_for(self.tickets.subscribe(), pred).await
    }

    pub async fn wait_for_session(
        &self,
        pred: impl FnMut(&SessionState) -> bool,
    ) -> SessionState {
        wait_for(self.session.subscribe(), pred).await
    }
}

/// Wait until a watched value satisfies `pred`, failing the test after [`WAIT`]
pub async fn wait_for<T: Clone>(mut rx: watch::Receiver<T>, pred: impl FnMut(&T) -> bool) -> T {
    let state = within(rx.wait_for(pred)).await.expect("watch channel closed");
    state.clone()
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out waiting for store update")
}

/// Raw ticket row for `InMemoryService::seed`
pub fn ticket_row(
    id: &str,
    title: &str,
    status: &str,
    priority: &str,
    created_at: &str,
    user_id: &str,
) -> Row {
    as_row(json!({
        "id": id,
        "title": title,
        "description": "",
        "status": status,
        "priority": priority,
        "created_at": created_at,
        "user_id": user_id,
        "assigned_to": null,
    }))
}

pub fn comment_row(id: &str, ticket_id: &str, content: &str, created_at: &str, user_id: &str) -> Row {
    as_row(json!({
        "id": id,
        "ticket_id": ticket_id,
        "content": content,
        "created_at": created_at,
        "user_id": user_id,
    }))
}

pub fn as_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
