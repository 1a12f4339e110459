//! Shared TUI components

pub mod create_ticket;
pub mod footer;
pub mod header;
pub mod login;
pub mod ticket_detail;
pub mod ticket_list;
pub mod toast;

pub use create_ticket::{CreateField, CreateTicketForm, CreateTicketFormProps, cycle_priority};
pub use footer::{
    Footer, FooterProps, Shortcut, comment_shortcuts, create_shortcuts, detail_shortcuts,
    list_shortcuts, login_shortcuts,
};
pub use header::{Header, HeaderProps};
pub use login::{LoginField, LoginForm, LoginFormProps, mask_password};
pub use ticket_detail::{StatusButtons, TicketDetail, TicketDetailProps, status_for_key};
pub use ticket_list::{TicketList, TicketListProps, TicketRow, TicketRowProps, scroll_to_selection};
pub use toast::{TOAST_TTL, is_visible, render_toast};
