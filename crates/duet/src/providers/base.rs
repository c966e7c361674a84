use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

use crate::models::message::Message;

/// Token counts attributable to one or more model invocations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub completion_tokens: u32,
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Self {
        Self {
            completion_tokens,
            prompt_tokens,
            total_tokens,
        }
    }

    /// Approximate usage from the prompt and completion text, four characters per token
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = estimate_tokens(prompt);
        let completion_tokens = estimate_tokens(completion);
        Self::new(
            prompt_tokens,
            completion_tokens,
            prompt_tokens.saturating_add(completion_tokens),
        )
    }

    /// Field-wise sum where a missing side counts as zero
    pub fn combine(a: Option<Usage>, b: Option<Usage>) -> Usage {
        a.unwrap_or_default() + b.unwrap_or_default()
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}

pub fn estimate_tokens(text: &str) -> u32 {
    let tokens = text.chars().count().div_ceil(4);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

/// Narrow a reported token count, saturating counts that do not fit
pub fn token_count(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Text returned by a model, with token counts when the provider reports them
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

impl Completion {
    pub fn new<S: Into<String>>(text: S, usage: Option<Usage>) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// Base trait for AI providers (OpenAI, Anthropic, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a completion for the conversation using the configured model
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion>;
}
