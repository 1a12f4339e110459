//! Keyboard shortcuts bar component

use iocraft::prelude::*;

use crate::tui::theme::theme;

#[derive(Debug, Clone)]
pub struct Shortcut {
    /// The key or key combination (e.g., "q", "Ctrl+S", "Tab")
    pub key: String,
    /// Description of the action (e.g., "Quit", "Save", "Next field")
    pub action: String,
}

impl Shortcut {
    pub fn new(key: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action: action.into(),
        }
    }
}

#[derive(Default, Props)]
pub struct FooterProps {
    pub shortcuts: Vec<Shortcut>,
}

/// Keyboard shortcuts bar at the bottom of the screen
#[component]
pub fn Footer(props: &FooterProps) -> impl Into<AnyElement<'static>> {
    let theme = theme();

    element! {
        View(
            width: 100pct,
            min_height: 1,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::Wrap,
            flex_shrink: 0.0,
            padding_left: 1,
            padding_right: 1,
            column_gap: 2,
            background_color: theme.border,
        ) {
            #(props.shortcuts.iter().map(|shortcut| {
                let key = shortcut.key.clone();
                let action = shortcut.action.clone();
                element! {
                    View(flex_direction: FlexDirection::Row) {
                        Text(
                            content: format!("[{}]", key),
                            color: theme.highlight,
                            weight: Weight::Bold,
                        )
                        Text(
                            content: format!(" {}", action),
                            color: theme.text,
                        )
                    }
                }
            }))
        }
    }
}

pub fn login_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut::new("Tab", "Next field"),
        Shortcut::new("Enter", "Sign in"),
        Shortcut::new("Esc", "Quit"),
    ]
}

pub fn list_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut::new("j/k", "Navigate"),
        Shortcut::new("Enter", "Open"),
        Shortcut::new("n", "New ticket"),
        Shortcut::new("r", "Refresh"),
        Shortcut::new("L", "Logout"),
        Shortcut::new("q", "Quit"),
    ]
}

pub fn detail_shortcuts(is_admin: bool) -> Vec<Shortcut> {
    let mut shortcuts = vec![Shortcut::new("c", "Comment")];
    if is_admin {
        shortcuts.push(Shortcut::new("1/2/3", "Open/In Progress/Resolved"));
    }
    shortcuts.push(Shortcut::new("Esc", "Back to tickets"));
    shortcuts
}

pub fn comment_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut::new("Enter", "Post comment"),
        Shortcut::new("Esc", "Cancel"),
    ]
}

pub fn create_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut::new("Tab", "Next field"),
        Shortcut::new("←/→", "Priority"),
        Shortcut::new("Ctrl+S", "Create"),
        Shortcut::new("Esc", "Back to tickets"),
    ]
}
