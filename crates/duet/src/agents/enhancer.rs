use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::base::{Agent, AgentOutput, UsageAccounting};
use super::coerce::StageOutput;
use super::context::AgentContext;
use crate::errors::{PipelineError, PipelineResult};
use crate::models::message::{last_user_message, Message};
use crate::models::model_info::{strip_tags, ModelInfo};
use crate::progress::StageProgress;
use crate::prompt_template::load_embedded_prompt;
use crate::providers::base::{CompletionOptions, Usage};
use crate::resolver::{resolve_model, ModelInvoker};

pub const ENHANCE_LABEL: &str = "enhance";
pub const DEFAULT_ENHANCER_TEMPERATURE: f32 = 0.7;

#[derive(Serialize)]
struct EnhancerPrompt<'a> {
    prompt: &'a str,
}

/// Rewrites the newest user request into a more explicit prompt
pub struct PromptEnhancer {
    invoker: Arc<dyn ModelInvoker>,
    temperature: f32,
    max_tokens: Option<u32>,
    accounting: UsageAccounting,
}

impl PromptEnhancer {
    pub fn new(invoker: Arc<dyn ModelInvoker>) -> Self {
        Self {
            invoker,
            temperature: DEFAULT_ENHANCER_TEMPERATURE,
            max_tokens: None,
            accounting: UsageAccounting::Reported,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_usage_accounting(mut self, accounting: UsageAccounting) -> Self {
        self.accounting = accounting;
        self
    }

    async fn enhance(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<(String, Usage)> {
        let user_message = last_user_message(messages).ok_or(PipelineError::MissingUserMessage)?;

        // The selection comes from the newest message, which need not be the user's
        let info = ModelInfo::from_history(messages);
        let target = resolve_model(&info, ctx)?;

        let original = strip_tags(user_message.text());
        let instruction = load_embedded_prompt(
            "enhancer.md",
            &EnhancerPrompt {
                prompt: original.trim(),
            },
        )?;
        let request = vec![Message::user(instruction)];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: target.clamp_max_tokens(self.max_tokens),
        };

        tracing::debug!(provider = %target.kind, model = %target.model, "Invoking enhancer model");
        let completion = self.invoker.invoke(&request, &target, &options).await?;

        let enhanced = completion.text.trim().to_string();
        let usage = self
            .accounting
            .usage(completion.usage, request[0].text(), &enhanced);
        Ok((enhanced, usage))
    }
}

#[async_trait]
impl Agent for PromptEnhancer {
    fn label(&self) -> &'static str {
        ENHANCE_LABEL
    }

    async fn execute(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<AgentOutput> {
        let progress = StageProgress::start(
            ctx.sink.as_ref(),
            ENHANCE_LABEL,
            ctx.progress_counter,
            "Enhancing prompt",
        );

        match self.enhance(messages, ctx).await {
            Ok((enhanced, usage)) => {
                tracing::info!(total_tokens = usage.total_tokens, "Prompt enhanced");
                let progress_counter = progress.complete("Prompt enhanced");
                Ok(AgentOutput {
                    output: StageOutput::Text(enhanced),
                    usage: Some(usage),
                    progress_counter,
                })
            }
            Err(err) => {
                tracing::error!("Prompt enhancement failed: {}", err);
                progress.fail(&err);
                Err(err)
            }
        }
    }
}
