//! Slash command parsing for the chat application.
//!
//! Lines that start with `/` control the client and are never sent to the
//! endpoint.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Switch between the light and dark theme.
    Theme,

    /// Show the current session identifier.
    Session,

    /// Forget the session identifier so the next prompt starts a new one.
    NewSession,

    /// Display request counts and current settings.
    Stats,

    /// Invalid command with error message.
    Invalid(String),
}

/// Parse a line of input as a slash command.
///
/// Returns `None` if the line is not a command (doesn't start with `/`).
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match (command.as_str(), argument) {
        ("help" | "?", _) => ChatCommand::Help,
        ("quit" | "exit" | "q", _) => ChatCommand::Quit,
        ("theme", None) => ChatCommand::Theme,
        ("theme", Some(_)) => ChatCommand::Invalid("/theme takes no argument".to_string()),
        ("session", _) => ChatCommand::Session,
        ("new", _) => ChatCommand::NewSession,
        ("stats" | "status", _) => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns the help text for available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /theme                 Toggle between light and dark theme
  /session               Show the current session id
  /new                   Start a new session
  /stats                 Show request statistics
  /help                  Show this help message
  /quit                  Exit the chat

Enter sends the prompt; Alt+Enter or Shift+Enter inserts a line break."#
}
