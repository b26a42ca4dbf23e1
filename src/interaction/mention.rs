//! Answering @-mentions of the bot.

use tracing::{Instrument, debug, error, info, instrument};

use crate::base::types::{HandlerError, MentionEvent};

use super::{
    Services,
    channel_lock::ChannelSlot,
    transcript::{render_prompt, strip_mention, window},
};

/// Handles an @-mention event.
///
/// The channel slot is reserved here, before spawning, so turns in one channel run in
/// dispatch order. The new task frees the chat listener to deliver the next event.
#[instrument(skip_all)]
pub fn handle_mention(event: MentionEvent, services: Services) {
    let slot = services.locks.reserve(&event.channel_id);

    tokio::spawn(async move {
        // Process the event.
        let result = process_mention_in(slot, &event, &services).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling mention: {}", err);
        }
    });
}

/// Runs one conversation turn and returns the reply that was sent.
///
/// Nothing is stored and nothing is sent when the completion fails.
pub async fn process_mention(event: &MentionEvent, services: &Services) -> Result<String, HandlerError> {
    let slot = services.locks.reserve(&event.channel_id);

    process_mention_in(slot, event, services).await
}

#[instrument(skip_all, fields(channel_id = %event.channel_id))]
async fn process_mention_in(slot: ChannelSlot, event: &MentionEvent, services: &Services) -> Result<String, HandlerError> {
    let Services { config, db, llm, chat, .. } = services;
    let channel_id = &event.channel_id;

    let _guard = slot.acquire().await;

    let input = strip_mention(&event.text, chat.bot_user_id());

    // Build the prompt from the channel history.

    let history = db.list_ordered(channel_id).await.map_err(HandlerError::Storage)?;
    let prompt = render_prompt(window(&history, config.history_max_turns), &input);

    debug!("Rendered prompt:\n{}", prompt);

    // Complete, remember, reply.

    let completion = llm.complete(&prompt).await.map_err(HandlerError::Completion)?;

    db.append(&input, &completion, channel_id).await.map_err(HandlerError::Storage)?;

    info!("Replying to mention ...");

    chat.send_message(channel_id, &event.thread_ts, &completion).await.map_err(HandlerError::Chat)?;

    Ok(completion)
}
