//! User-facing notifications raised by the stores.
//!
//! The stores report every success and failure of a user action as a
//! [`Toast`]. A [`Toaster`] fans them out to whichever front end is running:
//! the TUI renders the latest one in a bar, CLI commands print them to stderr.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::broadcast;

const HISTORY_LIMIT: usize = 32;

/// A toast notification message
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    /// When the toast was created
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ToastLevel::Info => "info",
            ToastLevel::Warning => "warning",
            ToastLevel::Error => "error",
            ToastLevel::Success => "success",
        };
        f.write_str(label)
    }
}

impl Toast {
    pub fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Instant::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Error)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Success)
    }

    pub fn is_error(&self) -> bool {
        self.level == ToastLevel::Error
    }
}

/// Cloneable handle used by the stores to raise toasts.
#[derive(Clone)]
pub struct Toaster {
    sender: broadcast::Sender<Toast>,
    history: Arc<Mutex<VecDeque<Toast>>>,
}

impl Default for Toaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Toaster {
    pub fn new() -> Self {
        Self {
            sender: broadcast::channel(HISTORY_LIMIT).0,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT))),
        }
    }

    pub fn push(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => tracing::warn!("toast: {}", toast.message),
            _ => tracing::debug!("toast ({}): {}", toast.level, toast.message),
        }
        {
            let mut history = self.history.lock();
            if history.len() == HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back(toast.clone());
        }
        // Nobody listening is fine; the history still has it
        let _ = self.sender.send(toast);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Toast::success(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Toast::error(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Toast::info(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(Toast::warning(message));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }

    /// Toasts raised so far, oldest first
    pub fn recent(&self) -> Vec<Toast> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Toast> {
        self.history.lock().back().cloned()
    }

    /// Remove and return everything in the history
    pub fn take_all(&self) -> Vec<Toast> {
        self.history.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_order() {
        let toaster = Toaster::new();
        toaster.success("one");
        toaster.error("two");
        let recent = toaster.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "one");
        assert!(recent[1].is_error());
        assert_eq!(toaster.latest().unwrap().message, "two");
    }

    #[test]
    fn test_history_is_bounded() {
        let toaster = Toaster::new();
        for i in 0..(HISTORY_LIMIT + 5) {
            toaster.info(format!("toast {i}"));
        }
        let recent = toaster.recent();
        assert_eq!(recent.len(), HISTORY_LIMIT);
        assert_eq!(recent[0].message, "toast 5");
    }

    #[test]
    fn test_take_all_empties_history() {
        let toaster = Toaster::new();
        toaster.warning("careful");
        assert_eq!(toaster.take_all().len(), 1);
        assert!(toaster.latest().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_receive_toasts() {
        let toaster = Toaster::new();
        let mut rx = toaster.subscribe();
        toaster.clone().success("Welcome back!");
        let toast = rx.recv().await.unwrap();
        assert_eq!(toast.message, "Welcome back!");
        assert_eq!(toast.level, ToastLevel::Success);
    }
}
