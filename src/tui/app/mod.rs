//! Ticket desk TUI (`ticketdesk tui`)
//!
//! One root component that mirrors the session and ticket stores into
//! local state and routes keys to the current screen.

pub mod handlers;

use std::sync::Arc;

use iocraft::prelude::*;
use tokio::sync::{Mutex, broadcast, mpsc};

use crate::session::SessionStore;
use crate::tickets::TicketStore;
use crate::toast::{Toast, Toaster};
use crate::tui::components::{
    CreateField, CreateTicketForm, Footer, Header, LoginField, LoginForm, TOAST_TTL, TicketDetail,
    TicketList, comment_shortcuts, create_shortcuts, cycle_priority, detail_shortcuts,
    list_shortcuts, login_shortcuts, render_toast, scroll_to_selection,
};
use crate::tui::theme::theme;
use crate::types::{NewTicket, Ticket, TicketPriority, TicketStatus, User};
use crate::validate;

pub use handlers::{Intent, Mode, Screen, map_key};

/// Backend work queued from the key handler
#[derive(Debug, Clone)]
enum DeskAction {
    Login {
        email: String,
        password: String,
    },
    Logout,
    Refresh,
    Create(NewTicket),
    SetStatus {
        ticket_id: String,
        status: TicketStatus,
    },
    Comment {
        ticket_id: String,
        content: String,
        user_id: String,
    },
}

struct ActionChannel {
    tx: mpsc::UnboundedSender<DeskAction>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<DeskAction>>>,
}

fn select_row(
    selected: &mut State<usize>,
    scroll: &mut State<usize>,
    index: usize,
    visible: usize,
) {
    selected.set(index);
    scroll.set(scroll_to_selection(index, scroll.get(), visible));
}

fn queue(sender: &mpsc::UnboundedSender<DeskAction>, action: DeskAction) {
    if sender.send(action).is_err() {
        tracing::warn!("Action queue closed, dropping action");
    }
}

#[derive(Default, Props)]
pub struct DeskAppProps {
    pub session: Option<Arc<SessionStore>>,
    pub tickets: Option<Arc<TicketStore>>,
    /// Show demo credentials on the login screen
    pub demo: bool,
}

/// Layout:
/// ```text
/// +------------------------------------------+
/// | Header                                    |
/// +------------------------------------------+
/// | Login | TicketList | TicketDetail | Form  |
/// +------------------------------------------+
/// | Toast (when present)                      |
/// | Footer                                    |
/// +------------------------------------------+
/// ```
#[component]
pub fn DeskApp<'a>(props: &DeskAppProps, mut hooks: Hooks) -> impl Into<AnyElement<'a>> {
    let (width, height) = hooks.use_terminal_size();
    let mut system = hooks.use_context_mut::<SystemContext>();

    // Mirrors of store state
    let user: State<Option<User>> = hooks.use_state(|| None);
    let session_loading = hooks.use_state(|| true);
    let tickets: State<Vec<Ticket>> = hooks.use_state(Vec::new);
    let tickets_loading = hooks.use_state(|| false);
    let toast: State<Option<Toast>> = hooks.use_state(|| None);

    // Navigation
    let mut screen = hooks.use_state(Screen::default);
    let mut selected_index = hooks.use_state(|| 0usize);
    let mut scroll_offset = hooks.use_state(|| 0usize);
    let mut detail_id = hooks.use_state(String::new);
    let mut commenting = hooks.use_state(|| false);
    let comment = hooks.use_state(String::new);
    let mut should_exit = hooks.use_state(|| false);

    // Login form
    let email = hooks.use_state(String::new);
    let mut password = hooks.use_state(String::new);
    let mut login_focus = hooks.use_state(LoginField::default);
    let mut login_error: State<Option<String>> = hooks.use_state(|| None);
    let mut submitting = hooks.use_state(|| false);

    // Create form
    let new_title = hooks.use_state(String::new);
    let new_description = hooks.use_state(String::new);
    let mut new_priority = hooks.use_state(TicketPriority::default);
    let mut create_focus = hooks.use_state(CreateField::default);
    let mut create_error: State<Option<String>> = hooks.use_state(|| None);
    let mut creating = hooks.use_state(|| false);

    let channel: State<ActionChannel> = hooks.use_state(|| {
        let (tx, rx) = mpsc::unbounded_channel::<DeskAction>();
        ActionChannel {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    });
    let action_sender = channel.read().tx.clone();
    let action_receiver = channel.read().rx.clone();

    let toaster: Option<Toaster> = props.session.as_ref().map(|s| s.toaster().clone());

    // Load the session, then the tickets
    let bootstrap: Handler<()> = hooks.use_async_handler({
        let session = props.session.clone();
        let tickets = props.tickets.clone();
        move |()| {
            let session = session.clone();
            let tickets = tickets.clone();
            async move {
                if let Some(session) = session
                    && let Err(e) = session.activate().await
                {
                    tracing::warn!("Could not restore session: {}", e);
                }
                if let Some(tickets) = tickets
                    && let Err(e) = tickets.activate().await
                {
                    tracing::debug!("Initial ticket load failed: {}", e);
                }
            }
        }
    });

    let follow_session: Handler<()> = hooks.use_async_handler({
        let session = props.session.clone();
        move |()| {
            let session = session.clone();
            let mut user = user;
            let mut session_loading = session_loading;
            async move {
                let Some(session) = session else {
                    session_loading.set(false);
                    return;
                };
                let mut rx = session.subscribe();
                loop {
                    let state = rx.borrow_and_update().clone();
                    user.set(state.user);
                    session_loading.set(state.loading);
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let follow_tickets: Handler<()> = hooks.use_async_handler({
        let store = props.tickets.clone();
        move |()| {
            let store = store.clone();
            let mut tickets = tickets;
            let mut tickets_loading = tickets_loading;
            async move {
                let Some(store) = store else {
                    return;
                };
                let mut rx = store.subscribe();
                loop {
                    let state = rx.borrow_and_update().clone();
                    tickets.set(state.tickets);
                    tickets_loading.set(state.loading);
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Show the newest toast and clear it once it has been idle long enough
    let follow_toasts: Handler<()> = hooks.use_async_handler({
        let toaster = toaster.clone();
        move |()| {
            let toaster = toaster.clone();
            let mut toast = toast;
            async move {
                let Some(toaster) = toaster else {
                    return;
                };
                let mut rx = toaster.subscribe();
                if let Some(latest) = toaster.latest() {
                    toast.set(Some(latest));
                }
                loop {
                    match tokio::time::timeout(TOAST_TTL, rx.recv()).await {
                        Ok(Ok(next)) => toast.set(Some(next)),
                        Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                        Ok(Err(broadcast::error::RecvError::Closed)) => break,
                        Err(_) => {
                            if toast.read().is_some() {
                                toast.set(None);
                            }
                        }
                    }
                }
            }
        }
    });

    // Run queued actions one at a time. Stores report outcomes as toasts.
    let action_processor: Handler<()> = hooks.use_async_handler({
        let session = props.session.clone();
        let tickets = props.tickets.clone();
        let action_receiver = action_receiver.clone();
        move |()| {
            let session = session.clone();
            let tickets = tickets.clone();
            let action_receiver = action_receiver.clone();
            let mut password = password;
            let mut submitting = submitting;
            let mut screen = screen;
            let mut selected_index = selected_index;
            let mut scroll_offset = scroll_offset;
            let mut new_title = new_title;
            let mut new_description = new_description;
            let mut new_priority = new_priority;
            let mut create_focus = create_focus;
            let mut creating = creating;
            let mut comment = comment;
            let mut commenting = commenting;

            async move {
                let (Some(session), Some(tickets)) = (session, tickets) else {
                    return;
                };
                let mut rx = action_receiver.lock().await;
                while let Some(action) = rx.recv().await {
                    match action {
                        DeskAction::Login { email, password: secret } => {
                            let result = session.login(&email, &secret).await;
                            password.set(String::new());
                            submitting.set(false);
                            if result.is_ok() {
                                screen.set(Screen::List);
                                selected_index.set(0);
                                scroll_offset.set(0);
                            }
                        }
                        DeskAction::Logout => {
                            if session.logout().await.is_ok() {
                                screen.set(Screen::List);
                            }
                        }
                        DeskAction::Refresh => {
                            if let Err(e) = tickets.refresh().await {
                                tracing::debug!("Refresh failed: {}", e);
                            }
                        }
                        DeskAction::Create(ticket) => {
                            let result = tickets.create_ticket(ticket).await;
                            creating.set(false);
                            if result.is_ok() {
                                new_title.set(String::new());
                                new_description.set(String::new());
                                new_priority.set(TicketPriority::default());
                                create_focus.set(CreateField::default());
                                screen.set(Screen::List);
                                selected_index.set(0);
                                scroll_offset.set(0);
                            }
                        }
                        DeskAction::SetStatus { ticket_id, status } => {
                            if let Err(e) = tickets.set_status(&ticket_id, status).await {
                                tracing::debug!("Status change failed: {}", e);
                            }
                        }
                        DeskAction::Comment {
                            ticket_id,
                            content,
                            user_id,
                        } => {
                            let result = tickets.add_comment(&ticket_id, &content, &user_id).await;
                            if result.is_ok() {
                                comment.set(String::new());
                                commenting.set(false);
                            }
                        }
                    }
                }
            }
        }
    });

    // Start the background handlers on mount
    let mut load_started = hooks.use_state(|| false);
    if !load_started.get() {
        load_started.set(true);
        follow_session.clone()(());
        follow_tickets.clone()(());
        follow_toasts.clone()(());
        action_processor.clone()(());
        bootstrap.clone()(());
    }

    let current_user = user.read().clone();
    let ticket_list = tickets.read().clone();
    let is_admin = current_user.as_ref().is_some_and(User::is_admin);

    let mode = if session_loading.get() {
        Mode::Loading
    } else if current_user.is_none() {
        Mode::Login(login_focus.get())
    } else {
        match screen.get() {
            Screen::List => Mode::List,
            Screen::Detail => Mode::Detail {
                commenting: commenting.get(),
                is_admin,
            },
            Screen::Create => Mode::Create(create_focus.get()),
        }
    };

    // Header (1) + footer (1) + borders (2) + scroll indicators (2) + toast (3)
    let list_height = height.saturating_sub(9) as usize;

    if !ticket_list.is_empty() && selected_index.get() >= ticket_list.len() {
        selected_index.set(ticket_list.len() - 1);
    }

    hooks.use_terminal_events({
        let action_sender = action_sender.clone();
        let toaster = toaster.clone();
        let ticket_ids: Vec<String> = ticket_list.iter().map(|t| t.id.clone()).collect();
        let user_id = current_user.as_ref().map(|u| u.id.clone());
        move |event| match event {
            TerminalEvent::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) if kind != KeyEventKind::Release => {
                let count = ticket_ids.len();
                let current = selected_index.get();

                match map_key(mode, code, modifiers) {
                    Intent::Quit => should_exit.set(true),
                    Intent::NextField => match mode {
                        Mode::Login(field) => login_focus.set(field.next()),
                        Mode::Create(field) => create_focus.set(field.next()),
                        _ => {}
                    },
                    Intent::PasswordChar(c) => {
                        let mut value = password.to_string();
                        value.push(c);
                        password.set(value);
                    }
                    Intent::PasswordBackspace => {
                        let mut value = password.to_string();
                        value.pop();
                        password.set(value);
                    }
                    Intent::SubmitLogin => {
                        if submitting.get() {
                            return;
                        }
                        let email_value = email.to_string();
                        let password_value = password.to_string();
                        match validate::credentials(&email_value, &password_value) {
                            Ok((email_value, password_value)) => {
                                login_error.set(None);
                                submitting.set(true);
                                queue(
                                    &action_sender,
                                    DeskAction::Login {
                                        email: email_value.to_string(),
                                        password: password_value.to_string(),
                                    },
                                );
                            }
                            Err(e) => login_error.set(Some(e.to_string())),
                        }
                    }
                    Intent::MoveDown if count > 0 => select_row(
                        &mut selected_index,
                        &mut scroll_offset,
                        (current + 1).min(count - 1),
                        list_height,
                    ),
                    Intent::MoveUp => select_row(
                        &mut selected_index,
                        &mut scroll_offset,
                        current.saturating_sub(1),
                        list_height,
                    ),
                    Intent::Top => {
                        select_row(&mut selected_index, &mut scroll_offset, 0, list_height)
                    }
                    Intent::Bottom if count > 0 => select_row(
                        &mut selected_index,
                        &mut scroll_offset,
                        count - 1,
                        list_height,
                    ),
                    Intent::Open => {
                        if let Some(id) = ticket_ids.get(current) {
                            detail_id.set(id.clone());
                            commenting.set(false);
                            screen.set(Screen::Detail);
                        }
                    }
                    Intent::NewTicket => {
                        create_error.set(None);
                        create_focus.set(CreateField::default());
                        screen.set(Screen::Create);
                    }
                    Intent::Refresh => queue(&action_sender, DeskAction::Refresh),
                    Intent::Logout => queue(&action_sender, DeskAction::Logout),
                    Intent::Back => {
                        commenting.set(false);
                        screen.set(Screen::List);
                    }
                    Intent::StartComment => commenting.set(true),
                    Intent::CancelComment => commenting.set(false),
                    Intent::SubmitComment => {
                        let Some(user_id) = user_id.clone() else {
                            return;
                        };
                        let content = comment.to_string();
                        match validate::comment(&content) {
                            Ok(content) => queue(
                                &action_sender,
                                DeskAction::Comment {
                                    ticket_id: detail_id.to_string(),
                                    content: content.to_string(),
                                    user_id,
                                },
                            ),
                            Err(e) => {
                                if let Some(toaster) = &toaster {
                                    toaster.warning(e.to_string());
                                }
                            }
                        }
                    }
                    Intent::SetStatus(status) => queue(
                        &action_sender,
                        DeskAction::SetStatus {
                            ticket_id: detail_id.to_string(),
                            status,
                        },
                    ),
                    Intent::PriorityDown => {
                        new_priority.set(cycle_priority(new_priority.get(), false));
                    }
                    Intent::PriorityUp => {
                        new_priority.set(cycle_priority(new_priority.get(), true));
                    }
                    Intent::SubmitTicket => {
                        if creating.get() {
                            return;
                        }
                        let Some(user_id) = user_id.clone() else {
                            return;
                        };
                        let title_value = new_title.to_string();
                        let description_value = new_description.to_string();
                        let checked = validate::title(&title_value).and_then(|title| {
                            validate::description(&description_value)
                                .map(|description| (title, description))
                        });
                        match checked {
                            Ok((title, description)) => {
                                create_error.set(None);
                                creating.set(true);
                                queue(
                                    &action_sender,
                                    DeskAction::Create(NewTicket::new(
                                        title,
                                        description,
                                        new_priority.get(),
                                        user_id,
                                    )),
                                );
                            }
                            Err(e) => create_error.set(Some(e.to_string())),
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    });

    if should_exit.get() {
        system.exit();
    }

    let theme = theme();

    let (subtitle, shortcuts) = match mode {
        Mode::Loading => ("Loading", vec![]),
        Mode::Login(_) => ("Sign in", login_shortcuts()),
        Mode::List => ("Tickets", list_shortcuts()),
        Mode::Detail {
            commenting: true, ..
        } => ("Ticket", comment_shortcuts()),
        Mode::Detail { is_admin, .. } => ("Ticket", detail_shortcuts(is_admin)),
        Mode::Create(_) => ("New Ticket", create_shortcuts()),
    };

    let body: AnyElement<'static> = match mode {
        Mode::Loading => element! {
            View(
                width: 100pct,
                height: 100pct,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
            ) {
                Text(content: "Loading...", color: theme.text_dimmed)
            }
        }
        .into_any(),
        Mode::Login(field) => element! {
            LoginForm(
                email: Some(email),
                password_len: password.read().chars().count(),
                focus: field,
                submitting: submitting.get(),
                error: login_error.read().clone(),
                demo: props.demo,
            )
        }
        .into_any(),
        Mode::List => element! {
            TicketList(
                tickets: ticket_list.clone(),
                selected_index: selected_index.get(),
                scroll_offset: scroll_offset.get(),
                has_focus: true,
                visible_height: list_height,
            )
        }
        .into_any(),
        Mode::Detail {
            commenting: is_commenting,
            ..
        } => {
            let id = detail_id.to_string();
            element! {
                TicketDetail(
                    ticket: ticket_list.iter().find(|t| t.id == id).cloned(),
                    viewer: current_user.clone(),
                    comment: Some(comment),
                    commenting: is_commenting,
                )
            }
            .into_any()
        }
        Mode::Create(field) => element! {
            CreateTicketForm(
                title: Some(new_title),
                description: Some(new_description),
                priority: new_priority.get(),
                focus: field,
                submitting: creating.get(),
                error: create_error.read().clone(),
            )
        }
        .into_any(),
    };

    let signed_in = current_user.is_some();
    let current_toast = toast.read().clone();

    element! {
        View(
            width,
            height,
            flex_direction: FlexDirection::Column,
            background_color: theme.background,
        ) {
            Header(
                subtitle: Some(subtitle),
                user: current_user.clone(),
                ticket_count: signed_in.then_some(ticket_list.len()),
                syncing: signed_in && tickets_loading.get(),
            )
            View(flex_grow: 1.0, width: 100pct) {
                #(Some(body))
            }
            #(render_toast(&current_toast))
            Footer(shortcuts: shortcuts)
        }
    }
}
