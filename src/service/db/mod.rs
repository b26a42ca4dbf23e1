use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::base::types::{Res, Void};

pub mod surreal;

// Traits.

/// Generic database client trait that clients must implement.
///
/// This is the conversation history store: an append-only log of exchanges,
/// grouped by channel. Implementing this trait allows different database
/// backends to be used with the relay-bot.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Appends one exchange to the channel's history.
    ///
    /// The store assigns the record ID and the creation timestamp. Fields
    /// beyond the configured length bound are truncated.
    async fn append(&self, prompt: &str, completion: &str, channel_id: &str) -> Void;

    /// Gets all turns for the channel, oldest first.
    async fn list_ordered(&self, channel_id: &str) -> Res<Vec<Turn>>;

    /// Counts the turns stored for the channel.
    async fn count(&self, channel_id: &str) -> Res<u64>;

    /// Removes every turn for the channel. Succeeds when there is nothing to remove.
    async fn clear(&self, channel_id: &str) -> Void;
}

// Structs.

/// Database client for relay-bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    /// The database client instance.
    pub inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}

/// One stored exchange: what the user said, and what the model replied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub prompt: String,
    pub completion: String,
}

impl Turn {
    pub fn new(prompt: impl Into<String>, completion: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            completion: completion.into(),
        }
    }
}

/// Cuts `text` down to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn truncate_cuts_on_char_boundary() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("こんにちは", 2), "こん");
    }
}
