/// Prefix (case-folded, own word) that gates operator commands.
pub const ADMIN_PREFIX: &str = "admin";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    /// `/ticket [id]` - with an id, look it up immediately; without, prompt.
    Ticket { ticket_id: Option<String> },
    KnownIssues,
    ErrorInfo,
    NewTicket,
    Help,
    Unknown { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    CloseBot,
    RestartBot,
    RefreshBot,
    Unknown { input: String },
}

/// Numeric shortcuts from the legacy text menu, kept for backward
/// compatibility with existing transcripts. `N` or an `N.` prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuShortcut {
    ExistingTicket,
    KnownIssues,
    ErrorInfo,
    NewTicket,
}

/// Returns `None` when the text is not a slash command at all.
pub fn parse_slash_command(cleaned: &str) -> Option<BotCommand> {
    let rest = cleaned.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let first_arg = parts.next();

    Some(match name.as_str() {
        "ticket" => BotCommand::Ticket { ticket_id: first_arg.map(str::to_owned) },
        "knownissues" => BotCommand::KnownIssues,
        "errorinfo" => BotCommand::ErrorInfo,
        "newticket" => BotCommand::NewTicket,
        "help" => BotCommand::Help,
        _ => BotCommand::Unknown { name },
    })
}

/// Returns `None` unless the text starts with the admin prefix as its own
/// word (so e.g. "administrator" does not match).
pub fn parse_admin_command(cleaned: &str) -> Option<AdminCommand> {
    let folded = cleaned.to_lowercase();
    let rest = folded.strip_prefix(ADMIN_PREFIX)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let remainder = rest.trim();
    Some(match remainder {
        "close bot" => AdminCommand::CloseBot,
        "restart bot" => AdminCommand::RestartBot,
        "refresh bot" => AdminCommand::RefreshBot,
        _ => AdminCommand::Unknown { input: remainder.to_owned() },
    })
}

pub fn parse_menu_shortcut(cleaned: &str) -> Option<MenuShortcut> {
    let trimmed = cleaned.trim();
    let digit = match trimmed {
        _ if trimmed == "1" || trimmed.starts_with("1.") => '1',
        _ if trimmed == "2" || trimmed.starts_with("2.") => '2',
        _ if trimmed == "3" || trimmed.starts_with("3.") => '3',
        _ if trimmed == "4" || trimmed.starts_with("4.") => '4',
        _ => return None,
    };

    Some(match digit {
        '1' => MenuShortcut::ExistingTicket,
        '2' => MenuShortcut::KnownIssues,
        '3' => MenuShortcut::ErrorInfo,
        _ => MenuShortcut::NewTicket,
    })
}
