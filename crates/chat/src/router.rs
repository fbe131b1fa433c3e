use std::sync::Arc;

use deskbot_core::{KnownIssue, KnownIssueIndex, SessionState, SessionStore};
use deskbot_helpdesk::{HelpdeskError, NewTicket, TicketService};
use tracing::{debug, info, warn};

use crate::cards::{self, ChatResponse};
use crate::commands::{self, AdminCommand, BotCommand, MenuShortcut};
use crate::events::{strip_mentions, ChatEvent, EventType, User};

/// Fixed at build time: senders outside this domain cannot use the bot.
pub const ORG_EMAIL_DOMAIN: &str = "harborpoint.health";
/// Fixed at build time: only these identities may issue admin commands.
pub const ADMIN_USERS: &[&str] = &["itops@harborpoint.health"];

/// Which arm of the message priority contract claimed a cleaned message.
/// Pure classification so the priority order is testable as a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageRoute {
    Help,
    Slash(BotCommand),
    Admin(AdminCommand),
    Session,
    Shortcut(MenuShortcut),
    Menu,
}

/// Priority order: help keyword > slash command > admin command > active
/// session > legacy shortcut > menu fallback. Each arm short-circuits the
/// rest.
pub fn classify_message(
    cleaned: &str,
    sender_is_admin: bool,
    has_active_session: bool,
) -> MessageRoute {
    if cleaned.eq_ignore_ascii_case("help") {
        return MessageRoute::Help;
    }
    if let Some(command) = commands::parse_slash_command(cleaned) {
        return MessageRoute::Slash(command);
    }
    if sender_is_admin {
        if let Some(command) = commands::parse_admin_command(cleaned) {
            return MessageRoute::Admin(command);
        }
    }
    if has_active_session {
        return MessageRoute::Session;
    }
    if let Some(shortcut) = commands::parse_menu_shortcut(cleaned) {
        return MessageRoute::Shortcut(shortcut);
    }
    MessageRoute::Menu
}

/// Maps one inbound event to exactly one response, advancing per-user
/// session state as a side effect. All service failures are rendered as
/// user-facing messages; the router itself never fails.
pub struct ConversationRouter {
    sessions: Arc<dyn SessionStore>,
    tickets: Arc<dyn TicketService>,
    known_issues: Arc<dyn KnownIssueIndex>,
}

struct Sender {
    email: String,
    display_name: String,
}

impl ConversationRouter {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        tickets: Arc<dyn TicketService>,
        known_issues: Arc<dyn KnownIssueIndex>,
    ) -> Self {
        Self { sessions, tickets, known_issues }
    }

    pub async fn handle(&self, event: &ChatEvent) -> ChatResponse {
        match event.event_type {
            Some(EventType::AddedToSpace) | Some(EventType::AppHome) => {
                cards::static_menu(&display_name_of(event))
            }
            Some(EventType::CardClicked) => self.handle_card_click(event).await,
            Some(EventType::SubmitDialog) => self.handle_dialog(event).await,
            Some(EventType::Message) => self.handle_message(event).await,
            Some(EventType::Unknown) => {
                // Fail open: an event type we do not recognize still gets
                // a usable menu.
                debug!(event_name = "chat.router.unknown_event_type", "showing default menu");
                cards::static_menu(&display_name_of(event))
            }
            None => ChatResponse::text(cards::UNHANDLED_EVENT_TEXT),
        }
    }

    async fn handle_card_click(&self, event: &ChatEvent) -> ChatResponse {
        let Some(sender) = event_sender(event) else {
            return cards::static_menu(&display_name_of(event));
        };
        let action = event.action.as_ref().and_then(|action| action.name()).unwrap_or_default();
        debug!(
            event_name = "chat.router.card_clicked",
            user_email = %sender.email,
            action = %action,
            "card action received"
        );

        match action {
            cards::ACTION_EXISTING_TICKET => {
                self.sessions.set(&sender.email, SessionState::AwaitingTicketNumber).await;
                ChatResponse::text(cards::TICKET_NUMBER_PROMPT)
            }
            cards::ACTION_ERROR_INFO => {
                self.sessions.set(&sender.email, SessionState::AwaitingErrorInfo).await;
                ChatResponse::text(cards::ERROR_INFO_PROMPT)
            }
            cards::ACTION_NEW_TICKET => {
                self.sessions.set(&sender.email, SessionState::AwaitingTicketDetails).await;
                ChatResponse::text(cards::new_ticket_prompt())
            }
            _ => cards::static_menu(&sender.display_name),
        }
    }

    async fn handle_dialog(&self, event: &ChatEvent) -> ChatResponse {
        let Some(sender) = event_sender(event) else {
            return cards::static_menu(&display_name_of(event));
        };
        let (Some(subject), Some(description)) = (
            event.common.as_ref().and_then(|common| common.string_value("subject")),
            event.common.as_ref().and_then(|common| common.string_value("description")),
        ) else {
            // Malformed dialog submission: fall back to the menu rather
            // than failing the request.
            warn!(
                event_name = "chat.router.dialog_missing_fields",
                user_email = %sender.email,
                "dialog submission lacked subject/description"
            );
            return cards::static_menu(&sender.display_name);
        };

        let request = NewTicket {
            subject: subject.to_owned(),
            body: description.to_owned(),
            requester_name: sender.display_name.clone(),
            requester_email: sender.email.clone(),
            custom_fields: None,
        };
        self.create_and_render(request, &sender).await
    }

    async fn handle_message(&self, event: &ChatEvent) -> ChatResponse {
        let Some(message) = event.message.as_ref() else {
            return cards::static_menu(&display_name_of(event));
        };
        let Some(sender) = message.sender.as_ref().and_then(sender_of) else {
            return cards::static_menu(&display_name_of(event));
        };

        let cleaned = strip_mentions(&message.text, &message.annotations);
        let sender_is_admin = ADMIN_USERS.contains(&sender.email.as_str());
        let session = self.sessions.get(&sender.email).await.filter(SessionState::is_active);

        let route = classify_message(&cleaned, sender_is_admin, session.is_some());
        debug!(
            event_name = "chat.router.message",
            user_email = %sender.email,
            route = ?route,
            "message classified"
        );

        match route {
            MessageRoute::Help => self.handle_help(&sender).await,
            MessageRoute::Slash(command) => self.handle_slash(command, &sender).await,
            MessageRoute::Admin(command) => handle_admin(command),
            MessageRoute::Session => {
                // classify_message only returns Session when one is active
                let state = session.unwrap_or(SessionState::Idle);
                self.handle_session(state, &cleaned, &sender).await
            }
            MessageRoute::Shortcut(shortcut) => self.handle_shortcut(shortcut, &sender).await,
            MessageRoute::Menu => cards::static_menu(&sender.display_name),
        }
    }

    async fn handle_help(&self, sender: &Sender) -> ChatResponse {
        if !is_org_member(&sender.email) {
            // Session state is deliberately left untouched for
            // unauthorized senders.
            info!(
                event_name = "chat.router.help_unauthorized",
                user_email = %sender.email,
                "help requested from outside the organization"
            );
            return ChatResponse::text(cards::UNAUTHORIZED_TEXT);
        }

        self.sessions.clear(&sender.email).await;
        cards::static_menu(&sender.display_name)
    }

    async fn handle_slash(&self, command: BotCommand, sender: &Sender) -> ChatResponse {
        match command {
            BotCommand::Ticket { ticket_id: Some(ticket_id) } => {
                self.fetch_and_render(&ticket_id).await
            }
            BotCommand::Ticket { ticket_id: None } => {
                self.sessions.set(&sender.email, SessionState::AwaitingTicketNumber).await;
                ChatResponse::text(cards::TICKET_NUMBER_PROMPT)
            }
            BotCommand::KnownIssues => cards::known_issues_text(),
            BotCommand::ErrorInfo => {
                self.sessions.set(&sender.email, SessionState::AwaitingErrorInfo).await;
                ChatResponse::text(cards::ERROR_INFO_PROMPT)
            }
            BotCommand::NewTicket => {
                self.sessions.set(&sender.email, SessionState::AwaitingTicketDetails).await;
                ChatResponse::text(cards::new_ticket_prompt())
            }
            BotCommand::Help => cards::static_menu(&sender.display_name),
            BotCommand::Unknown { name } => ChatResponse::text(format!(
                "Command `/{name}` is not recognized. Try `/help` for the list of commands."
            )),
        }
    }

    async fn handle_shortcut(&self, shortcut: MenuShortcut, sender: &Sender) -> ChatResponse {
        match shortcut {
            MenuShortcut::ExistingTicket => {
                self.sessions.set(&sender.email, SessionState::AwaitingTicketNumber).await;
                ChatResponse::text(cards::TICKET_NUMBER_PROMPT)
            }
            MenuShortcut::KnownIssues => cards::known_issues_text(),
            MenuShortcut::ErrorInfo => {
                self.sessions.set(&sender.email, SessionState::AwaitingErrorInfo).await;
                ChatResponse::text(cards::ERROR_INFO_PROMPT)
            }
            MenuShortcut::NewTicket => {
                self.sessions.set(&sender.email, SessionState::AwaitingTicketDetails).await;
                ChatResponse::text(cards::new_ticket_prompt())
            }
        }
    }

    async fn handle_session(
        &self,
        state: SessionState,
        cleaned: &str,
        sender: &Sender,
    ) -> ChatResponse {
        match state {
            SessionState::AwaitingTicketNumber => {
                // Single-shot: the session ends after one lookup attempt,
                // success or not.
                let response = self.fetch_and_render(cleaned.trim()).await;
                self.sessions.clear(&sender.email).await;
                response
            }
            SessionState::AwaitingErrorInfo => match self.known_issues.lookup(cleaned) {
                Some(issue) => {
                    self.sessions
                        .set(&sender.email, SessionState::AwaitingTicketCreationAfterError)
                        .await;
                    ChatResponse::text(known_issue_found_text(cleaned, &issue))
                }
                None => {
                    self.sessions
                        .set(&sender.email, SessionState::AwaitingNewTicketAfterError)
                        .await;
                    ChatResponse::text(format!(
                        "No known issue found for '{cleaned}'. Do you want to open a new ticket (Y/N)?"
                    ))
                }
            },
            SessionState::AwaitingTicketCreationAfterError
            | SessionState::AwaitingNewTicketAfterError => {
                if cleaned.eq_ignore_ascii_case("y") {
                    self.sessions.set(&sender.email, SessionState::AwaitingTicketDetails).await;
                    ChatResponse::text(cards::new_ticket_prompt())
                } else {
                    self.sessions.clear(&sender.email).await;
                    ChatResponse::text(cards::RETURN_TO_MENU_TEXT)
                }
            }
            SessionState::AwaitingTicketDetails => {
                let request = NewTicket {
                    subject: format!("New ticket from {}", sender.display_name),
                    body: format!("User provided details: {cleaned}"),
                    requester_name: sender.display_name.clone(),
                    requester_email: sender.email.clone(),
                    custom_fields: None,
                };
                self.create_and_render(request, sender).await
            }
            SessionState::Idle => cards::static_menu(&sender.display_name),
        }
    }

    async fn fetch_and_render(&self, ticket_id: &str) -> ChatResponse {
        match self.tickets.fetch_ticket(ticket_id).await {
            Ok(ticket) => ChatResponse::text(format!(
                "Ticket #{} information:\nSubject: {}\nStatus: {}",
                ticket.id, ticket.subject, ticket.status
            )),
            Err(HelpdeskError::NotFound) => {
                ChatResponse::text(format!("Ticket #{ticket_id} not found."))
            }
            Err(HelpdeskError::Timeout) => ChatResponse::text(format!(
                "The lookup for ticket #{ticket_id} timed out. Please try again."
            )),
            Err(error) => {
                warn!(
                    event_name = "chat.router.fetch_failed",
                    ticket_id = %ticket_id,
                    error = %error,
                    "ticket fetch failed"
                );
                ChatResponse::text(format!("Error fetching ticket #{ticket_id}: {error}"))
            }
        }
    }

    async fn create_and_render(&self, request: NewTicket, sender: &Sender) -> ChatResponse {
        // Single-shot either way: clear before reporting the outcome.
        let result = self.tickets.create_ticket(request).await;
        self.sessions.clear(&sender.email).await;

        match result {
            Ok(ticket) => {
                info!(
                    event_name = "chat.router.ticket_created",
                    user_email = %sender.email,
                    ticket_id = ticket.id,
                    "new ticket created"
                );
                ChatResponse::text(format!(
                    "New ticket created successfully! Ticket ID: {}",
                    ticket.id
                ))
            }
            Err(HelpdeskError::Timeout) => ChatResponse::text(
                "The ticket creation request timed out. Please try again.".to_owned(),
            ),
            Err(error) => {
                warn!(
                    event_name = "chat.router.create_failed",
                    user_email = %sender.email,
                    error = %error,
                    "ticket creation failed"
                );
                ChatResponse::text(format!("Error creating ticket: {error}"))
            }
        }
    }
}

fn handle_admin(command: AdminCommand) -> ChatResponse {
    // Acknowledgement-only: no lifecycle action actually occurs.
    ChatResponse::text(match command {
        AdminCommand::CloseBot => "Admin command received: closing the bot.".to_owned(),
        AdminCommand::RestartBot => "Admin command received: restarting the bot.".to_owned(),
        AdminCommand::RefreshBot => "Admin command received: refreshing the bot.".to_owned(),
        AdminCommand::Unknown { .. } => {
            "Admin command not recognized. Available commands: 'close bot', 'restart bot', \
             'refresh bot'."
                .to_owned()
        }
    })
}

fn is_org_member(email: &str) -> bool {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.eq_ignore_ascii_case(ORG_EMAIL_DOMAIN))
        .unwrap_or(false)
}

fn known_issue_found_text(query: &str, issue: &KnownIssue) -> String {
    let mut text = format!(
        "Found known issue for '{query}': {}. Would you like to add this to a new ticket (Y/N)?",
        issue.title
    );
    if let Some(url) = &issue.reference_url {
        text.push_str(&format!("\nReference: {url}"));
    }
    text
}

fn display_name_of(event: &ChatEvent) -> String {
    event
        .user
        .as_ref()
        .and_then(|user| user.display_name.clone())
        .or_else(|| {
            event
                .message
                .as_ref()
                .and_then(|message| message.sender.as_ref())
                .and_then(|sender| sender.display_name.clone())
        })
        .unwrap_or_else(|| cards::FALLBACK_DISPLAY_NAME.to_owned())
}

fn event_sender(event: &ChatEvent) -> Option<Sender> {
    event.user.as_ref().and_then(sender_of)
}

fn sender_of(user: &User) -> Option<Sender> {
    let email = user.email.clone()?;
    let display_name =
        user.display_name.clone().unwrap_or_else(|| cards::FALLBACK_DISPLAY_NAME.to_owned());
    Some(Sender { email, display_name })
}
