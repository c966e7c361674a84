use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{token_count, Completion, CompletionOptions, Provider, Usage};
use super::configs::AnthropicProviderConfig;
use super::utils::send_json;
use crate::models::message::Message;
use crate::models::role::Role;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8000;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Option<Usage> {
        let usage = data.get("usage")?;
        let input_tokens = token_count(usage.get("input_tokens").and_then(Value::as_u64)?);
        let output_tokens = token_count(usage.get("output_tokens").and_then(Value::as_u64)?);
        Some(Usage::new(
            input_tokens,
            output_tokens,
            input_tokens.saturating_add(output_tokens),
        ))
    }

    /// Split the conversation into the top-level system prompt and the chat turns,
    /// since the messages API does not accept a system role inside `messages`
    fn messages_to_anthropic_spec(messages: &[Message]) -> (String, Vec<Value>) {
        let mut system = Vec::new();
        let mut anthropic_messages = Vec::new();

        for message in messages {
            let text = message.text();
            match message.role {
                Role::System => system.push(text.to_string()),
                Role::User | Role::Assistant => {
                    if text.is_empty() {
                        continue;
                    }
                    let role = if message.role == Role::User {
                        "user"
                    } else {
                        "assistant"
                    };
                    anthropic_messages.push(json!({
                        "role": role,
                        "content": text
                    }));
                }
            }
        }

        (system.join("\n\n"), anthropic_messages)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload);

        send_json(request).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let (system, anthropic_messages) = Self::messages_to_anthropic_spec(messages);

        let mut payload = json!({
            "model": self.config.model,
            "messages": anthropic_messages,
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
        });

        if let Some(object) = payload.as_object_mut() {
            if !system.is_empty() {
                object.insert("system".to_string(), json!(system));
            }
            if let Some(temp) = options.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
        }

        let response = self.post(payload).await?;

        let text = response
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.iter().find(|block| block["type"] == "text"))
            .and_then(|block| block.get("text"))
            .and_then(|text| text.as_str())
            .ok_or_else(|| anyhow!("Invalid response format from Anthropic API"))?;

        Ok(Completion::new(text, Self::get_usage(&response)))
    }
}
