//! Keyboard mapping for the desk app
//!
//! Keys are first turned into an [`Intent`] based on what is on screen.
//! The component then applies the intent to its state.

use iocraft::prelude::{KeyCode, KeyModifiers};

use crate::tui::components::{CreateField, LoginField, status_for_key};
use crate::types::TicketStatus;

/// Dashboard screen while signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    List,
    Detail,
    Create,
}

/// Everything the key mapping needs to know about the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Loading,
    Login(LoginField),
    List,
    Detail { commenting: bool, is_admin: bool },
    Create(CreateField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Quit,
    NextField,
    PasswordChar(char),
    PasswordBackspace,
    SubmitLogin,
    MoveUp,
    MoveDown,
    Top,
    Bottom,
    Open,
    NewTicket,
    Refresh,
    Logout,
    Back,
    StartComment,
    CancelComment,
    SubmitComment,
    SetStatus(TicketStatus),
    PriorityDown,
    PriorityUp,
    SubmitTicket,
    /// Key belongs to a focused text input, or does nothing here
    Ignore,
}

pub fn map_key(mode: Mode, code: KeyCode, modifiers: KeyModifiers) -> Intent {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && code == KeyCode::Char('c') {
        return Intent::Quit;
    }

    match mode {
        Mode::Loading => match code {
            KeyCode::Char('q') | KeyCode::Esc => Intent::Quit,
            _ => Intent::Ignore,
        },
        Mode::Login(field) => match code {
            KeyCode::Esc => Intent::Quit,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => Intent::NextField,
            KeyCode::Enter => Intent::SubmitLogin,
            KeyCode::Char(c) if field == LoginField::Password && !ctrl => Intent::PasswordChar(c),
            KeyCode::Backspace if field == LoginField::Password => Intent::PasswordBackspace,
            _ => Intent::Ignore,
        },
        Mode::List => match code {
            KeyCode::Char('q') | KeyCode::Esc => Intent::Quit,
            KeyCode::Char('j') | KeyCode::Down => Intent::MoveDown,
            KeyCode::Char('k') | KeyCode::Up => Intent::MoveUp,
            KeyCode::Char('g') | KeyCode::Home => Intent::Top,
            KeyCode::Char('G') | KeyCode::End => Intent::Bottom,
            KeyCode::Enter | KeyCode::Char('l') => Intent::Open,
            KeyCode::Char('n') => Intent::NewTicket,
            KeyCode::Char('r') => Intent::Refresh,
            KeyCode::Char('L') => Intent::Logout,
            _ => Intent::Ignore,
        },
        Mode::Detail {
            commenting: true, ..
        } => match code {
            KeyCode::Esc => Intent::CancelComment,
            KeyCode::Enter => Intent::SubmitComment,
            _ => Intent::Ignore,
        },
        Mode::Detail { is_admin, .. } => match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::Backspace => {
                Intent::Back
            }
            KeyCode::Char('c') => Intent::StartComment,
            KeyCode::Char(c) if is_admin => status_for_key(c)
                .map(Intent::SetStatus)
                .unwrap_or(Intent::Ignore),
            _ => Intent::Ignore,
        },
        Mode::Create(field) => match code {
            KeyCode::Esc => Intent::Back,
            KeyCode::Char('s') if ctrl => Intent::SubmitTicket,
            KeyCode::Tab | KeyCode::BackTab => Intent::NextField,
            KeyCode::Enter if field == CreateField::Title => Intent::NextField,
            KeyCode::Enter if field == CreateField::Priority => Intent::SubmitTicket,
            KeyCode::Left if field == CreateField::Priority => Intent::PriorityDown,
            KeyCode::Right if field == CreateField::Priority => Intent::PriorityUp,
            _ => Intent::Ignore,
        },
    }
}
