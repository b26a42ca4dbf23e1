//! Event handling and user interactions for relay-bot.
//!
//! This module provides functionality for handling chat events:
//! - Answering @-mentions with a completion built from the channel history
//! - Serving the `history` / `forget` slash-command arguments
//! - Rendering transcripts and serializing turns per channel

pub mod channel_lock;
pub mod command;
pub mod mention;
pub mod transcript;

use crate::{
    base::config::Config,
    service::{chat::ChatClient, db::DbClient, llm::LlmClient},
};

use channel_lock::ChannelLocks;

/// Everything a handler needs to serve one event.
///
/// It is trivially cloneable, and is stored as the chat listener's user state.
#[derive(Clone)]
pub struct Services {
    /// The configuration for the application.
    pub config: Config,
    /// The conversation history store.
    pub db: DbClient,
    /// The completion service.
    pub llm: LlmClient,
    /// The chat client replies are sent through.
    pub chat: ChatClient,
    /// Per-channel turn queues.
    pub locks: ChannelLocks,
}
