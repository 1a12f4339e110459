//! New ticket form

use iocraft::prelude::*;

use crate::tui::theme::theme;
use crate::types::TicketPriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateField {
    #[default]
    Title,
    Description,
    Priority,
}

impl CreateField {
    pub fn next(self) -> Self {
        match self {
            CreateField::Title => CreateField::Description,
            CreateField::Description => CreateField::Priority,
            CreateField::Priority => CreateField::Title,
        }
    }
}

/// Step through priorities without wrapping
pub fn cycle_priority(current: TicketPriority, forward: bool) -> TicketPriority {
    let all = TicketPriority::ALL;
    let idx = all.iter().position(|p| *p == current).unwrap_or(1);
    let next = if forward {
        (idx + 1).min(all.len() - 1)
    } else {
        idx.saturating_sub(1)
    };
    all[next]
}

#[derive(Default, Props)]
pub struct CreateTicketFormProps {
    pub title: Option<State<String>>,
    pub description: Option<State<String>>,
    pub priority: TicketPriority,
    pub focus: CreateField,
    pub submitting: bool,
    pub error: Option<String>,
}

#[component]
pub fn CreateTicketForm(props: &CreateTicketFormProps) -> impl Into<AnyElement<'static>> {
    let theme = theme();
    let (Some(mut title), Some(mut description)) = (props.title, props.description) else {
        return element!(View);
    };
    let border_for = |field: CreateField| {
        if props.focus == field {
            theme.border_focused
        } else {
            theme.border
        }
    };
    let editable = !props.submitting;

    element! {
        View(
            width: 100pct,
            height: 100pct,
            flex_direction: FlexDirection::Column,
            border_style: BorderStyle::Round,
            border_color: theme.border_focused,
            padding_left: 1,
            padding_right: 1,
        ) {
            Text(content: "Create New Ticket", color: theme.text, weight: Weight::Bold)

            View(margin_top: 1) {
                Text(content: "Title", color: theme.text_dimmed)
            }
            View(
                height: 3,
                border_style: BorderStyle::Round,
                border_color: border_for(CreateField::Title),
                padding_left: 1,
                padding_right: 1,
            ) {
                TextInput(
                    value: title.to_string(),
                    has_focus: editable && props.focus == CreateField::Title,
                    on_change: move |value| title.set(value),
                    color: theme.text,
                )
            }

            Text(content: "Description", color: theme.text_dimmed)
            View(
                height: 8,
                border_style: BorderStyle::Round,
                border_color: border_for(CreateField::Description),
                padding_left: 1,
                padding_right: 1,
            ) {
                TextInput(
                    value: description.to_string(),
                    has_focus: editable && props.focus == CreateField::Description,
                    on_change: move |value| description.set(value),
                    multiline: true,
                    color: theme.text,
                )
            }

            View(flex_direction: FlexDirection::Row, gap: 2) {
                Text(
                    content: "Priority",
                    color: if props.focus == CreateField::Priority { theme.border_focused } else { theme.text_dimmed },
                )
                #(TicketPriority::ALL.iter().map(|priority| {
                    let active = *priority == props.priority;
                    element! {
                        View(
                            padding_left: 1,
                            padding_right: 1,
                            background_color: if active { Some(theme.priority_color(*priority)) } else { None },
                        ) {
                            Text(
                                content: priority.to_string(),
                                color: if active { Color::Black } else { theme.priority_color(*priority) },
                            )
                        }
                    }
                }))
            }

            #(props.error.clone().map(|error| element! {
                View(margin_top: 1) {
                    Text(content: error, color: theme.error)
                }
            }))

            #(props.submitting.then(|| element! {
                View(margin_top: 1) {
                    Text(content: "Creating...", color: theme.text_dimmed)
                }
            }))
        }
    }
}
