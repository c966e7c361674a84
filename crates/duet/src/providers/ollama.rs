use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Completion, CompletionOptions, Provider};
use super::configs::OllamaProviderConfig;
use super::utils::{messages_to_openai_spec, openai_response_text, openai_usage, send_json};
use crate::models::message::Message;

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "qwen2.5";

pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        send_json(self.client.post(&url).json(&payload)).await
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
        });

        if let Some(object) = payload.as_object_mut() {
            if let Some(temp) = options.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
            if let Some(tokens) = options.max_tokens {
                object.insert("max_tokens".to_string(), json!(tokens));
            }
        }

        let response = self.post(payload).await?;
        let text = openai_response_text(&response)?;

        Ok(Completion::new(text, openai_usage(&response)))
    }
}
