//! App header bar component
//!
//! Shows the application title, the current screen and who is signed in.

use iocraft::prelude::*;

use crate::tui::theme::theme;
use crate::types::User;

#[derive(Default, Props)]
pub struct HeaderProps<'a> {
    /// Screen name shown after the title
    pub subtitle: Option<&'a str>,
    /// Signed-in user, if any
    pub user: Option<User>,
    pub ticket_count: Option<usize>,
    /// Shown while a store is fetching
    pub syncing: bool,
}

#[component]
pub fn Header<'a>(props: &HeaderProps<'a>) -> impl Into<AnyElement<'a>> {
    let theme = theme();

    let left_text = match props.subtitle {
        Some(sub) => format!("Ticket System - {}", sub),
        None => "Ticket System".to_string(),
    };

    let welcome = props
        .user
        .as_ref()
        .map(|user| format!("Welcome, {} ({})", user.name, user.role));

    element! {
        View(
            width: 100pct,
            height: 1,
            flex_direction: FlexDirection::Row,
            flex_shrink: 0.0,
            justify_content: JustifyContent::SpaceBetween,
            padding_left: 1,
            padding_right: 1,
            background_color: theme.highlight,
        ) {
            Text(
                content: left_text,
                color: theme.text,
                weight: Weight::Bold,
            )
            View(flex_direction: FlexDirection::Row, gap: 2) {
                #(props.syncing.then(|| element! {
                    Text(content: "syncing...", color: theme.text_dimmed)
                }))
                #(props.ticket_count.map(|count| element! {
                    Text(
                        content: format!("{} tickets", count),
                        color: theme.text_dimmed,
                    )
                }))
                #(welcome.map(|text| element! {
                    Text(content: text, color: theme.text)
                }))
            }
        }
    }
}
