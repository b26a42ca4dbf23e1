//! Library root for `relay-bot`.
//!
//! Relay-bot answers @-mentions in Slack with an LLM completion, keeping a
//! linear conversation history per channel so that replies are context-aware:
//! - Each mention is rendered with the channel's past turns into one prompt
//! - Every completed turn is stored, and replayed on the next mention
//! - A slash command shows (`history`) or resets (`forget`) a channel's history
//!
//! The bot integrates with Slack for chat, SurrealDB for storage,
//! and OpenAI for completions. The architecture is built around
//! extensible traits that allow for different implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the relay-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with database, LLM, and chat clients
/// - Starts the main event loop for processing mentions and commands
pub async fn start(config: Config) -> Void {
    info!("Starting relay-bot ...");

    // Start the crypto provider.
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed.");
    }

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
