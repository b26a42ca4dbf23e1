//! Serving the bot's slash command.

use tracing::{Instrument, error, info, instrument};

use crate::base::{
    messages::{EMPTY_HISTORY, FORGET_CONFIRMATION, HELP_TEXT, turn_count},
    types::{Command, CommandEvent, HandlerError},
};

use super::{
    Services,
    channel_lock::ChannelSlot,
    transcript::{MAX_TRANSCRIPT_CHARS, render_history},
};

/// Handles a slash-command event.
///
/// The caller acknowledges the command to the platform; the work happens on a spawned task.
/// Commands that touch history reserve their channel slot before spawning, so they run in
/// dispatch order with the channel's mentions.
#[instrument(skip_all)]
pub fn handle_command(event: CommandEvent, services: Services) {
    let command = Command::parse(&event.text);
    let slot = reserve_for(command, &event, &services);

    tokio::spawn(async move {
        // Process the event.
        let result = process_command_in(command, slot, &event, &services).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling command: {}", err);
        }
    });
}

/// Runs the command named by the event's argument text, and returns which one ran.
pub async fn process_command(event: &CommandEvent, services: &Services) -> Result<Command, HandlerError> {
    let command = Command::parse(&event.text);
    let slot = reserve_for(command, event, services);

    process_command_in(command, slot, event, services).await
}

/// Help never touches history, so it does not wait for the channel.
fn reserve_for(command: Command, event: &CommandEvent, services: &Services) -> Option<ChannelSlot> {
    match command {
        Command::History | Command::Forget => Some(services.locks.reserve(&event.channel_id)),
        Command::Help => None,
    }
}

#[instrument(skip_all, fields(channel_id = %event.channel_id))]
async fn process_command_in(command: Command, slot: Option<ChannelSlot>, event: &CommandEvent, services: &Services) -> Result<Command, HandlerError> {
    let Services { db, chat, .. } = services;
    let channel_id = &event.channel_id;

    let _guard = match slot {
        Some(slot) => Some(slot.acquire().await),
        None => None,
    };

    match command {
        Command::History => {
            info!("Showing history ...");

            let turns = db.list_ordered(channel_id).await.map_err(HandlerError::Storage)?;
            let transcript = render_history(&turns, &event.user_id, MAX_TRANSCRIPT_CHARS);
            let text = if transcript.is_empty() { EMPTY_HISTORY } else { transcript.as_str() };

            chat.respond_ephemeral(&event.response_url, text).await.map_err(HandlerError::Chat)?;

            let count = db.count(channel_id).await.map_err(HandlerError::Storage)?;

            chat.send_message(channel_id, "", &turn_count(count)).await.map_err(HandlerError::Chat)?;
        }
        Command::Forget => {
            info!("Forgetting history ...");

            db.clear(channel_id).await.map_err(HandlerError::Storage)?;

            chat.send_message(channel_id, "", FORGET_CONFIRMATION).await.map_err(HandlerError::Chat)?;
        }
        Command::Help => {
            info!("Unrecognized command argument `{}`, sending help.", event.text);

            chat.respond_ephemeral(&event.response_url, HELP_TEXT).await.map_err(HandlerError::Chat)?;
        }
    }

    Ok(command)
}
