//! Rendering of stored turns into prompts and user-facing transcripts.

use crate::{base::messages::earlier_turns, service::db::Turn};

/// Character budget for a `history` transcript, below Slack's 40,000 character message limit.
pub const MAX_TRANSCRIPT_CHARS: usize = 35_000;

/// Replace every line break in `text` with a single space.
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Remove the bot's own mention token (`<@BOT_ID>`) from message text.
pub fn strip_mention(text: &str, bot_user_id: &str) -> String {
    text.replace(&format!("<@{bot_user_id}>"), "").trim().to_string()
}

/// The most recent `max_turns` turns; zero keeps them all.
pub fn window(history: &[Turn], max_turns: usize) -> &[Turn] {
    if max_turns == 0 || history.len() <= max_turns {
        history
    } else {
        &history[history.len() - max_turns..]
    }
}

/// Render past turns plus the new input into a completion prompt.
///
/// Each turn becomes a `User:` and an `Assistant:` line, and the prompt ends with
/// an open `Assistant: ` line for the model to continue.
pub fn render_prompt(history: &[Turn], input: &str) -> String {
    let mut prompt = String::new();

    for turn in history {
        prompt.push_str(&format!("User: {}\n", collapse_newlines(&turn.prompt)));
        prompt.push_str(&format!("Assistant: {}\n", collapse_newlines(&turn.completion)));
    }

    prompt.push_str(&format!("User: {}\nAssistant: ", collapse_newlines(input)));

    prompt
}

/// Render stored turns for the `history` command, attributing prompts to `user_id`.
///
/// Keeps the most recent turns that fit in `max_chars`; when older turns are left out,
/// the transcript opens with a line saying how many.
pub fn render_history(history: &[Turn], user_id: &str, max_chars: usize) -> String {
    let mut lines = Vec::new();
    let mut used = 0;

    for turn in history.iter().rev() {
        let line = format!("<@{}>: {}\nAI: {}", user_id, turn.prompt, turn.completion);
        let cost = line.chars().count() + 1;

        if cost > max_chars - used {
            break;
        }

        used += cost;
        lines.push(line);
    }

    let omitted = history.len() - lines.len();

    lines.reverse();

    if omitted > 0 {
        lines.insert(0, earlier_turns(omitted));
    }

    lines.join("\n")
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_renders_only_the_input() {
        assert_eq!(render_prompt(&[], "hi there"), "User: hi there\nAssistant: ");
    }

    #[test]
    fn history_renders_in_order() {
        let history = vec![Turn::new("hi", "hello"), Turn::new("how are you", "fine")];

        let prompt = render_prompt(&history, "and you?");

        assert_eq!(prompt, "User: hi\nAssistant: hello\nUser: how are you\nAssistant: fine\nUser: and you?\nAssistant: ");
    }

    #[test]
    fn newlines_inside_fields_become_spaces() {
        let history = vec![Turn::new("line one\nline two", "reply\r\nmore")];

        let prompt = render_prompt(&history, "a\nb");

        assert_eq!(prompt, "User: line one line two\nAssistant: reply more\nUser: a b\nAssistant: ");
    }

    #[test]
    fn strips_only_the_bot_mention() {
        assert_eq!(strip_mention("<@U12345> what is rust?", "U12345"), "what is rust?");
        assert_eq!(strip_mention("hey <@U12345>, ask <@U999>", "U12345"), "hey , ask <@U999>");
        assert_eq!(strip_mention("<@U12345>", "U12345"), "");
    }

    #[test]
    fn window_keeps_most_recent_turns() {
        let history: Vec<Turn> = (0..5).map(|i| Turn::new(format!("p{i}"), format!("c{i}"))).collect();

        assert_eq!(window(&history, 0).len(), 5);
        assert_eq!(window(&history, 10).len(), 5);
        assert_eq!(window(&history, 2), &history[3..]);
    }

    #[test]
    fn history_is_attributed_to_the_user() {
        let history = vec![Turn::new("hi", "hello"), Turn::new("bye", "see you")];

        assert_eq!(render_history(&history, "U1", MAX_TRANSCRIPT_CHARS), "<@U1>: hi\nAI: hello\n<@U1>: bye\nAI: see you");
        assert_eq!(render_history(&[], "U1", MAX_TRANSCRIPT_CHARS), "");
    }

    #[test]
    fn long_history_keeps_latest_turns_within_budget() {
        let history: Vec<Turn> = (0..200).map(|i| Turn::new(format!("question {i} {}", "x".repeat(400)), "y".repeat(400))).collect();

        let transcript = render_history(&history, "U1", 10_000);

        assert!(transcript.chars().count() <= 10_000 + earlier_turns(history.len()).chars().count() + 1);

        let first = transcript.lines().next().unwrap();
        let omitted: usize = first.trim_start_matches("… ").split(' ').next().unwrap().parse().unwrap();
        assert_eq!(first, earlier_turns(omitted));
        assert!(omitted > 0 && omitted < history.len());

        // The newest turn is always last, and the shown turns are contiguous.
        assert!(transcript.ends_with(&format!("AI: {}", "y".repeat(400))));
        assert!(transcript.contains(&format!("question {omitted} ")));
        assert!(!transcript.contains(&format!("question {} ", omitted - 1)));
    }
}
