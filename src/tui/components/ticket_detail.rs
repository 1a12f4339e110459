//! Ticket detail pane component
//!
//! Shows one ticket with its comments. Admins also see the status
//! buttons; everyone gets the comment box.

use iocraft::prelude::*;

use crate::display::{author_label, format_date, short_id};
use crate::tui::theme::theme;
use crate::types::{Ticket, TicketStatus, User};

#[derive(Default, Props)]
pub struct TicketDetailProps {
    /// The ticket to display (None shows empty state)
    pub ticket: Option<Ticket>,
    /// Signed-in user, used for role gating and comment authorship
    pub viewer: Option<User>,
    /// Draft comment text
    pub comment: Option<State<String>>,
    /// Whether the comment box has focus
    pub commenting: bool,
}

#[component]
pub fn TicketDetail(props: &TicketDetailProps) -> impl Into<AnyElement<'static>> {
    let theme = theme();

    let Some(ticket) = props.ticket.clone() else {
        return element! {
            View(
                width: 100pct,
                height: 100pct,
                border_style: BorderStyle::Round,
                border_color: theme.border,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
            ) {
                Text(content: "Ticket not found", color: theme.text_dimmed)
            }
        };
    };

    let viewer = props.viewer.clone();
    let is_admin = viewer.as_ref().is_some_and(|u| u.is_admin());
    let meta = format!(
        "{}  ·  {} priority  ·  opened {}",
        short_id(&ticket.id),
        ticket.priority,
        format_date(&ticket.created_at)
    );
    let comment_header = format!("Comments ({})", ticket.comments.len());

    element! {
        View(
            width: 100pct,
            height: 100pct,
            flex_direction: FlexDirection::Column,
            border_style: BorderStyle::Round,
            border_color: if props.commenting { theme.border } else { theme.border_focused },
            padding_left: 1,
            padding_right: 1,
        ) {
            View(flex_direction: FlexDirection::Row, gap: 2) {
                Text(content: ticket.title.clone(), color: theme.text, weight: Weight::Bold)
                Text(
                    content: ticket.status.label(),
                    color: theme.status_color(ticket.status),
                )
            }
            Text(content: meta, color: theme.text_dimmed)

            View(margin_top: 1) {
                Text(
                    content: if ticket.description.is_empty() {
                        "(no description)".to_string()
                    } else {
                        ticket.description.clone()
                    },
                    color: theme.text,
                )
            }

            #(is_admin.then(|| element! {
                StatusButtons(current: ticket.status)
            }))

            View(margin_top: 1, flex_direction: FlexDirection::Column, flex_grow: 1.0, overflow: Overflow::Hidden) {
                Text(content: comment_header, color: theme.text, weight: Weight::Bold)
                #(if ticket.comments.is_empty() {
                    vec![element! {
                        Text(content: "No comments yet", color: theme.text_dimmed)
                    }.into_any()]
                } else {
                    ticket.comments.iter().map(|comment| {
                        let author = author_label(&comment.user_id, viewer.as_ref());
                        element! {
                            View(flex_direction: FlexDirection::Column, margin_top: 1) {
                                Text(
                                    content: format!("{} · {}", author, format_date(&comment.created_at)),
                                    color: theme.id_color,
                                )
                                Text(content: comment.content.clone(), color: theme.text)
                            }
                        }.into_any()
                    }).collect()
                })
            }

            #(props.comment.map(|mut draft| element! {
                View(
                    height: 3,
                    flex_shrink: 0.0,
                    border_style: BorderStyle::Round,
                    border_color: if props.commenting { theme.border_focused } else { theme.border },
                    padding_left: 1,
                    padding_right: 1,
                ) {
                    #(if props.commenting || !draft.read().is_empty() {
                        element! {
                            TextInput(
                                value: draft.to_string(),
                                has_focus: props.commenting,
                                on_change: move |value| draft.set(value),
                                color: theme.text,
                            )
                        }.into_any()
                    } else {
                        element! {
                            Text(content: "Press c to add a comment", color: theme.text_dimmed)
                        }.into_any()
                    })
                }
            }))
        }
    }
}

#[derive(Default, Props)]
pub struct StatusButtonsProps {
    pub current: TicketStatus,
}

/// Row of status buttons keyed 1, 2 and 3
#[component]
pub fn StatusButtons(props: &StatusButtonsProps) -> impl Into<AnyElement<'static>> {
    let theme = theme();

    element! {
        View(flex_direction: FlexDirection::Row, margin_top: 1, gap: 2) {
            #(TicketStatus::ALL.iter().enumerate().map(|(i, status)| {
                let active = *status == props.current;
                element! {
                    View(
                        padding_left: 1,
                        padding_right: 1,
                        background_color: if active { Some(theme.status_color(*status)) } else { None },
                    ) {
                        Text(
                            content: format!("[{}] {}", i + 1, status.label()),
                            color: if active { Color::Black } else { theme.status_color(*status) },
                            weight: if active { Weight::Bold } else { Weight::Normal },
                        )
                    }
                }
            }))
        }
    }
}

/// Status bound to the number keys on the detail screen
pub fn status_for_key(c: char) -> Option<TicketStatus> {
    match c {
        '1' => Some(TicketStatus::Open),
        '2' => Some(TicketStatus::InProgress),
        '3' => Some(TicketStatus::Resolved),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_keys() {
        assert_eq!(status_for_key('2'), Some(TicketStatus::InProgress));
        assert_eq!(status_for_key('3'), Some(TicketStatus::Resolved));
        assert_eq!(status_for_key('4'), None);
    }
}
