//! Chat service integration for relay-bot.
//!
//! This module provides the Slack implementation of `GenericChatClient`:
//! - Receiving app mentions and slash commands over socket mode
//! - Posting replies to channels and threads
//! - Answering commands through their response URL

use crate::{
    base::{
        config::Config,
        types::{CommandEvent, MentionEvent, Res, Void},
    },
    interaction::{self, Services, channel_lock::ChannelLocks},
    service::{db::DbClient, llm::LlmClient},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config, db: DbClient, llm: LlmClient) -> Res<Self> {
        let client = SlackChatClient::new(config, db, llm).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
    config: Config,
    db: DbClient,
    llm: LlmClient,
    locks: ChannelLocks,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config, db: DbClient, llm: LlmClient) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_http1().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID, unless it is configured.

        let bot_user_id = match &config.slack_bot_user_id {
            Some(id) => id.clone(),
            None => {
                let session = client.open_session(&bot_token);
                session.auth_test().await?.user_id.0
            }
        };

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
            config: config.clone(),
            db,
            llm,
            locks: ChannelLocks::default(),
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(Services {
            config: self.config.clone(),
            db: self.db.clone(),
            llm: self.llm.clone(),
            chat: ChatClient::from(self.clone()),
            locks: self.locks.clone(),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message).with_link_names(true);

        if !thread_ts.is_empty() {
            request = request.with_thread_ts(SlackTs(thread_ts.to_string()));
        }

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip_all)]
    async fn respond_ephemeral(&self, response_url: &str, text: &str) -> Void {
        // Messages posted to a response URL are ephemeral unless asked otherwise.
        let request = SlackApiPostWebhookMessageRequest::new(SlackMessageContent::new().with_text(text.to_string()));
        let response_url = SlackResponseUrl(response_url.parse()?);

        let _ = self
            .client
            .respond_to_event(&response_url, &request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to respond to command: {}", e))?;

        Ok(())
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
///
/// The returned response is the acknowledgement, so the actual work is spawned and
/// finishes after Slack has been answered.
#[instrument(skip_all)]
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    let states = states.read().await;
    let services = states.get_user_state::<Services>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    info!("Received command event ...");

    let command = CommandEvent {
        channel_id: event.channel_id.0,
        user_id: event.user_id.0,
        text: event.text.unwrap_or_default(),
        response_url: event.response_url.0.to_string(),
    };

    interaction::command::handle_command(command, services.clone());

    Ok(SlackCommandEventResponse::new(SlackMessageContent::new()))
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let services = states.get_user_state::<Services>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            info!("Received app mention event ...");

            let mention = MentionEvent {
                channel_id: slack_app_mention_event.channel.0,
                thread_ts: slack_app_mention_event.origin.thread_ts.map(|ts| ts.0).unwrap_or_default(),
                text: slack_app_mention_event.content.text.unwrap_or_default(),
            };

            interaction::mention::handle_mention(mention, services.clone());
        }
        SlackEventCallbackBody::Message(_) => {
            debug!("Ignoring message event; only mentions are answered.");
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}
