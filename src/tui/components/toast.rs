//! Toast notification bar

use std::time::Duration;

use iocraft::prelude::*;

use crate::toast::Toast;
use crate::tui::theme::theme;

/// How long a toast stays on screen
pub const TOAST_TTL: Duration = Duration::from_secs(4);

pub fn is_visible(toast: &Toast) -> bool {
    toast.timestamp.elapsed() < TOAST_TTL
}

/// Render a toast notification as an optional element
pub fn render_toast(toast: &Option<Toast>) -> Option<AnyElement<'static>> {
    let theme = theme();
    toast.as_ref().filter(|t| is_visible(t)).map(|t| {
        let color = theme.toast_color(t.level);
        element! {
            View(
                width: 100pct,
                height: 3,
                flex_shrink: 0.0,
                align_items: AlignItems::Center,
                justify_content: JustifyContent::Center,
                background_color: Color::Black,
                border_edges: Edges::Top,
                border_style: BorderStyle::Single,
                border_color: color,
            ) {
                Text(content: t.message.clone(), color: color)
            }
        }
        .into_any()
    })
}
