//! Scrollable ticket list component

use iocraft::prelude::*;

use crate::display::{format_date, short_id};
use crate::tui::theme::{status_glyph, theme};
use crate::types::Ticket;

#[derive(Default, Props)]
pub struct TicketListProps {
    pub tickets: Vec<Ticket>,
    pub selected_index: usize,
    /// First visible ticket index
    pub scroll_offset: usize,
    pub has_focus: bool,
    /// Number of rows that fit in the pane
    pub visible_height: usize,
}

/// Keep `selected` on screen; returns the new scroll offset.
pub fn scroll_to_selection(selected: usize, offset: usize, visible: usize) -> usize {
    if visible == 0 {
        return selected;
    }
    if selected < offset {
        selected
    } else if selected >= offset + visible {
        selected + 1 - visible
    } else {
        offset
    }
}

#[component]
pub fn TicketList(props: &TicketListProps) -> impl Into<AnyElement<'static>> {
    let theme = theme();
    let border_color = if props.has_focus {
        theme.border_focused
    } else {
        theme.border
    };

    if props.tickets.is_empty() {
        return element! {
            View(
                width: 100pct,
                height: 100pct,
                border_style: BorderStyle::Round,
                border_color: border_color,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
            ) {
                Text(
                    content: "No tickets yet. Press n to create one.",
                    color: theme.text_dimmed,
                )
            }
        };
    }

    let total = props.tickets.len();
    let start = props.scroll_offset.min(total.saturating_sub(1));
    let end = (start + props.visible_height.max(1)).min(total);
    let has_more_below = end < total;

    element! {
        View(
            width: 100pct,
            height: 100pct,
            flex_direction: FlexDirection::Column,
            border_style: BorderStyle::Round,
            border_color: border_color,
        ) {
            #((start > 0).then(|| element! {
                View(height: 1, padding_left: 1) {
                    Text(
                        content: format!("  {} more above", start),
                        color: theme.text_dimmed,
                    )
                }
            }))

            #(props.tickets[start..end].iter().enumerate().map(|(i, ticket)| {
                element! {
                    TicketRow(
                        ticket: ticket.clone(),
                        is_selected: start + i == props.selected_index,
                    )
                }
            }))

            #(has_more_below.then(|| element! {
                View(height: 1, padding_left: 1) {
                    Text(
                        content: format!("  {} more below", total - end),
                        color: theme.text_dimmed,
                    )
                }
            }))
        }
    }
}

#[derive(Default, Props)]
pub struct TicketRowProps {
    pub ticket: Option<Ticket>,
    pub is_selected: bool,
}

/// Single ticket row: status, id, priority, date, title
#[component]
pub fn TicketRow(props: &TicketRowProps) -> impl Into<AnyElement<'static>> {
    let theme = theme();
    let Some(ticket) = props.ticket.as_ref() else {
        return element!(View(height: 1));
    };

    let selected = props.is_selected;
    let fg = |color: Color| if selected { theme.highlight_text } else { color };
    let indicator = if selected { ">" } else { " " };

    element! {
        View(
            height: 1,
            width: 100pct,
            flex_direction: FlexDirection::Row,
            padding_left: 1,
            padding_right: 1,
            background_color: if selected { Some(theme.highlight) } else { None },
        ) {
            View(width: 2, flex_shrink: 0.0) {
                Text(content: indicator, color: fg(theme.text))
            }
            View(width: 2, flex_shrink: 0.0) {
                Text(
                    content: status_glyph(ticket.status),
                    color: fg(theme.status_color(ticket.status)),
                    weight: Weight::Bold,
                )
            }
            View(width: 9, flex_shrink: 0.0) {
                Text(
                    content: short_id(&ticket.id).to_string(),
                    color: fg(theme.id_color),
                )
            }
            View(width: 8, flex_shrink: 0.0) {
                Text(
                    content: ticket.priority.to_string(),
                    color: fg(theme.priority_color(ticket.priority)),
                )
            }
            View(width: 17, flex_shrink: 0.0) {
                Text(
                    content: format_date(&ticket.created_at),
                    color: fg(theme.text_dimmed),
                )
            }
            View(flex_grow: 1.0, overflow: Overflow::Hidden) {
                Text(
                    content: ticket.title.clone(),
                    color: fg(theme.text),
                    wrap: TextWrap::NoWrap,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_follows_selection() {
        assert_eq!(scroll_to_selection(0, 0, 5), 0);
        assert_eq!(scroll_to_selection(5, 0, 5), 1);
        assert_eq!(scroll_to_selection(2, 4, 5), 2);
        assert_eq!(scroll_to_selection(6, 3, 5), 3);
        assert_eq!(scroll_to_selection(3, 0, 0), 3);
    }
}
