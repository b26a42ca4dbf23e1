//! Static texts the bot sends back to users.

/// Help text returned for any unrecognized slash-command argument.
pub const HELP_TEXT: &str = r#####"Add one of these arguments after the slash command:
```
- history  show the conversation context for this channel
- forget   reset the conversation context for this channel
```"#####;

/// Confirmation posted after a channel's history is cleared.
pub const FORGET_CONFIRMATION: &str = "All conversation history in this channel has been reset.";

/// Ephemeral response for `history` when nothing is stored.
pub const EMPTY_HISTORY: &str = "There is no conversation history in this channel yet.";

/// Message reporting how many turns the channel has stored.
pub fn turn_count(count: u64) -> String {
    format!("Number of conversation turns so far: {count}")
}

/// First line of a `history` transcript that had to leave out its oldest turns.
pub fn earlier_turns(count: usize) -> String {
    format!("… {count} earlier turns not shown")
}
