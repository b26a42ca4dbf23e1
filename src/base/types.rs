//! Common types, inbound events, and result handling.

use serde::{Deserialize, Serialize};

/// Error type used by the services.
pub type Err = anyhow::Error;
/// Result type used by the services.
pub type Res<T> = Result<T, Err>;
/// Result type for operations without a value.
pub type Void = Res<()>;

/// An @-mention of the bot, reduced to what the conversation handler needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionEvent {
    /// The channel the mention was posted in.
    pub channel_id: String,
    /// The thread the mention was posted in; empty for top-level messages.
    pub thread_ts: String,
    /// The raw message text, still containing the mention token.
    pub text: String,
}

/// A slash-command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEvent {
    /// The channel the command was invoked in.
    pub channel_id: String,
    /// The user who invoked the command.
    pub user_id: String,
    /// The argument text following the command name.
    pub text: String,
    /// Where ephemeral responses to this command are posted.
    pub response_url: String,
}

/// A recognized slash-command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the channel's stored turns.
    History,
    /// Clear the channel's stored turns.
    Forget,
    /// Anything else: explain the recognized arguments.
    Help,
}

impl Command {
    /// Parse the command argument text. Anything unrecognized asks for help.
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "history" => Command::History,
            "forget" => Command::Forget,
            _ => Command::Help,
        }
    }
}

/// Failures while handling a single inbound event.
///
/// These never escape the event; the spawned handler task logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The history store was unreachable, or a statement failed.
    #[error("storage error: {0:#}")]
    Storage(Err),
    /// The completion service failed or timed out.
    #[error("completion error: {0:#}")]
    Completion(Err),
    /// Posting a reply or command response failed.
    #[error("chat error: {0:#}")]
    Chat(Err),
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("history"), Command::History);
        assert_eq!(Command::parse(" forget \n"), Command::Forget);
    }

    #[test]
    fn unknown_or_empty_commands_ask_for_help() {
        assert_eq!(Command::parse(""), Command::Help);
        assert_eq!(Command::parse("xyz"), Command::Help);
        assert_eq!(Command::parse("History"), Command::Help);
    }

    #[test]
    fn handler_error_keeps_cause_in_message() {
        let err = HandlerError::Completion(anyhow::anyhow!("rate limited"));

        assert_eq!(err.to_string(), "completion error: rate limited");
    }
}
