pub mod cli;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod finder;
pub mod logging;
pub mod macros;
pub mod paths;
pub mod remote;
pub mod session;
pub mod tickets;
pub mod toast;
pub mod tui;
pub mod types;
pub mod validate;

pub use config::Config;
pub use error::{DeskError, Result};
pub use remote::{HostedService, InMemoryService, RemoteDataService};
pub use session::{SessionState, SessionStore};
pub use tickets::{TicketState, TicketStore};
pub use toast::{Toast, ToastLevel, Toaster};
pub use types::{
    Comment, NewTicket, Role, Ticket, TicketPatch, TicketPriority, TicketStatus, User,
};
