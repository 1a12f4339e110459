//! Theme system for TUI colors and styles
//!
//! Colors match the CLI output in `display.rs`.

use iocraft::prelude::Color;

use crate::toast::ToastLevel;
use crate::types::{TicketPriority, TicketStatus};

const GREY: Color = Color::Rgb {
    r: 120,
    g: 120,
    b: 120,
};

#[derive(Debug, Clone)]
pub struct Theme {
    pub status_open: Color,
    pub status_in_progress: Color,
    pub status_resolved: Color,

    pub priority_high: Color,
    pub priority_medium: Color,
    pub priority_low: Color,

    // UI colors
    pub border: Color,
    pub border_focused: Color,
    pub background: Color,
    pub text: Color,
    pub text_dimmed: Color,
    pub highlight: Color,
    pub highlight_text: Color,
    pub id_color: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_open: Color::Red,
            status_in_progress: Color::Yellow,
            status_resolved: Color::Green,

            priority_high: Color::Red,
            priority_medium: Color::Yellow,
            priority_low: Color::Green,

            border: GREY,
            border_focused: Color::Blue,
            background: Color::Reset,
            text: Color::White,
            text_dimmed: GREY,
            highlight: Color::Blue,
            highlight_text: Color::White,
            id_color: Color::Cyan,
            error: Color::Red,
        }
    }
}

impl Theme {
    pub fn status_color(&self, status: TicketStatus) -> Color {
        match status {
            TicketStatus::Open => self.status_open,
            TicketStatus::InProgress => self.status_in_progress,
            TicketStatus::Resolved => self.status_resolved,
        }
    }

    pub fn priority_color(&self, priority: TicketPriority) -> Color {
        match priority {
            TicketPriority::High => self.priority_high,
            TicketPriority::Medium => self.priority_medium,
            TicketPriority::Low => self.priority_low,
        }
    }

    pub fn toast_color(&self, level: ToastLevel) -> Color {
        match level {
            ToastLevel::Info => Color::Cyan,
            ToastLevel::Warning => Color::Yellow,
            ToastLevel::Error => Color::Red,
            ToastLevel::Success => Color::Green,
        }
    }
}

/// Status glyph used in lists
pub fn status_glyph(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Open => "!",
        TicketStatus::InProgress => "~",
        TicketStatus::Resolved => "✓",
    }
}

/// Global theme instance
pub static THEME: std::sync::LazyLock<Theme> = std::sync::LazyLock::new(Theme::default);

pub fn theme() -> &'static Theme {
    &THEME
}
