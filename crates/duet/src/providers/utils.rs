use anyhow::{anyhow, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};

use super::base::{token_count, Usage};
use crate::models::content::MessageContent;
use crate::models::message::Message;
use crate::models::role::Role;

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn content_to_openai_spec(content: &MessageContent) -> Value {
    match content {
        MessageContent::Plain(text) => json!(text),
        MessageContent::Parts(parts) => {
            let converted: Vec<Value> = parts
                .iter()
                .filter_map(|part| {
                    if part.is_text() {
                        part.text.as_ref().map(|text| json!({"type": "text", "text": text}))
                    } else {
                        part.image
                            .as_ref()
                            .map(|url| json!({"type": "image_url", "image_url": {"url": url}}))
                    }
                })
                .collect();
            json!(converted)
        }
    }
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            json!({
                "role": role_name(message.role),
                "content": content_to_openai_spec(&message.content),
            })
        })
        .collect()
}

/// Extract the assistant text from an OpenAI chat completion response
pub fn openai_response_text(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| anyhow!("Invalid response format: no message content in choices"))
}

/// Read the usage block of an OpenAI compatible response, if there is one
pub fn openai_usage(data: &Value) -> Option<Usage> {
    let usage = data.get("usage")?;
    let prompt_tokens = token_count(usage.get("prompt_tokens").and_then(Value::as_u64)?);
    let completion_tokens = token_count(usage.get("completion_tokens").and_then(Value::as_u64)?);
    let total_tokens = usage
        .get("total_tokens")
        .and_then(Value::as_u64)
        .map(token_count)
        .unwrap_or(prompt_tokens.saturating_add(completion_tokens));

    Some(Usage::new(prompt_tokens, completion_tokens, total_tokens))
}

/// Send a request and decode the JSON body, mapping failure statuses to errors
pub async fn send_json(request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;

    match response.status() {
        StatusCode::OK => Ok(response.json().await?),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(anyhow!("Server error: {}", status))
        }
        status => {
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!("Request failed: {} - {}", status, error_text))
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
