//! Integration with the OpenAI completion service.
//!
//! This module provides a thin wrapper around `async-openai` that turns a
//! rendered conversation transcript into the assistant's next reply.

use std::{sync::Arc, time::Duration};

use crate::base::{config::Config, types::Res};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{Content, CreateResponseArgs, Input, OutputContent, Response},
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build the request for a transcript.
    fn build_request(&self, prompt: &str) -> CreateResponseArgs {
        let mut request = CreateResponseArgs::default();

        request
            .model(&self.config.openai_model)
            .max_output_tokens(self.config.openai_max_tokens)
            .input(Input::Text(prompt.to_string()));

        // Reasoning (`o`) models reject a sampling temperature.
        if !self.config.openai_model.starts_with('o') {
            request.temperature(self.config.openai_temperature);
        }

        request
    }

    /// Make one OpenAI API call, bounded by the configured timeout.
    async fn call_openai_api(&self, request_builder: CreateResponseArgs) -> Res<Response> {
        let request = request_builder.build()?;
        let limit = Duration::from_secs(self.config.openai_timeout_secs);

        match timeout(limit, self.client.responses().create(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(anyhow::anyhow!("OpenAI API call failed: {err}")),
            Err(_) => Err(anyhow::anyhow!("OpenAI API call timed out after {} seconds", self.config.openai_timeout_secs)),
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::complete", skip_all)]
    async fn complete(&self, prompt: &str) -> Res<String> {
        debug!("Requesting completion for a {} character prompt.", prompt.len());

        let request = self.build_request(prompt);
        let response = self.call_openai_api(request).await?;

        let texts = parse_openai_response(&response)?;

        if texts.is_empty() {
            return Err(anyhow::anyhow!("OpenAI response contained no text."));
        }

        Ok(texts.join("\n").trim().to_string())
    }
}

/// Collect the output text segments of an OpenAI response.
#[instrument(skip_all)]
pub fn parse_openai_response(response: &Response) -> Res<Vec<String>> {
    let mut result = Vec::new();

    info!("LLM response has {} outputs.", response.output.len());
    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        Content::OutputText(text) => result.push(text.text.clone()),
                        Content::Refusal(reason) => {
                            return Err(anyhow::anyhow!("Request refused: {reason:#?}"));
                        }
                    }
                }
            }
            _ => {
                warn!("Unknown output: {output:#?}");
            }
        }
    }

    Ok(result)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::config::ConfigInner;

    fn create_test_config(model: &str) -> Config {
        Config::from(ConfigInner {
            openai_api_key: "sk-invalid-key-for-testing".to_string(),
            openai_model: model.to_string(),
            openai_timeout_secs: 10,
            ..ConfigInner::local()
        })
    }

    #[test]
    fn request_carries_model_and_prompt() {
        let client = OpenAiLlmClient::new(&create_test_config("gpt-4.1-mini"));

        let request = client.build_request("User: hi\nAssistant: ").build().unwrap();

        assert_eq!(request.model, "gpt-4.1-mini");
        assert_eq!(request.max_output_tokens, Some(2048));
        assert_eq!(request.temperature, Some(0.12));
        assert!(matches!(request.input, Input::Text(ref text) if text == "User: hi\nAssistant: "));
    }

    #[test]
    fn reasoning_models_omit_temperature() {
        let client = OpenAiLlmClient::new(&create_test_config("o3"));

        let request = client.build_request("User: hi\nAssistant: ").build().unwrap();

        assert_eq!(request.temperature, None);
    }
}
