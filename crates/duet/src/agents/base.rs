use async_trait::async_trait;

use super::coerce::StageOutput;
use super::context::AgentContext;
use crate::errors::PipelineResult;
use crate::models::message::Message;
use crate::providers::base::Usage;

/// What one stage produced
#[derive(Debug)]
pub struct AgentOutput {
    pub output: StageOutput,
    pub usage: Option<Usage>,
    /// Order of the last progress event the stage wrote
    pub progress_counter: u32,
}

/// How a stage accounts for the tokens it used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageAccounting {
    /// Use the provider's counts, estimating only when it reports none
    Reported,
    /// Always estimate from the text
    Estimated,
}

impl UsageAccounting {
    pub fn usage(&self, reported: Option<Usage>, prompt: &str, completion: &str) -> Usage {
        match (self, reported) {
            (UsageAccounting::Reported, Some(usage)) => usage,
            _ => Usage::estimate(prompt, completion),
        }
    }
}

/// One stage of the pipeline.
///
/// `execute` writes exactly two progress events to the context's sink, ordered after
/// `ctx.progress_counter`: one in-progress when it starts and one complete or error when it
/// ends. The returned counter is the order of the last event.
#[async_trait]
pub trait Agent: Send + Sync {
    fn label(&self) -> &'static str;

    async fn execute(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<AgentOutput>;
}

/// All message text of a conversation, as sent to the model
pub fn conversation_text(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::text)
        .collect::<Vec<_>>()
        .join("\n")
}
