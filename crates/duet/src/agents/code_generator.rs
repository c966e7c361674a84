use async_trait::async_trait;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;

use super::base::{conversation_text, Agent, AgentOutput, UsageAccounting};
use super::coerce::StageOutput;
use super::context::AgentContext;
use crate::context_selection::ContextSelector;
use crate::errors::{PipelineError, PipelineResult};
use crate::files::{create_files_context, FileMap, IgnoreSet};
use crate::models::content::MessageContent;
use crate::models::message::{last_user_index, Message};
use crate::models::model_info::{strip_tags, ModelInfo};
use crate::progress::StageProgress;
use crate::prompt_template::load_embedded_prompt;
use crate::providers::base::{CompletionOptions, Usage};
use crate::resolver::{resolve_model, ModelInvoker};

pub const CODE_GEN_LABEL: &str = "code-gen";
pub const DEFAULT_GENERATOR_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_CONTEXT_MAX_CHARS: usize = 200_000;

const DEFAULT_PROMPT: &str = "code_generator.md";

/// Where the serialized project files go in the generator request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPlacement {
    /// Inside the system instruction
    SystemPrompt,
    /// As an extra system message after the conversation
    Message,
}

#[derive(Serialize)]
struct GeneratorPrompt<'a> {
    files_context: &'a str,
}

fn prompt_template(prompt_id: Option<&str>) -> &'static str {
    match prompt_id {
        None | Some("default") => DEFAULT_PROMPT,
        Some("concise") => "code_generator_concise.md",
        Some(other) => {
            tracing::warn!(prompt_id = other, "Unknown prompt id, using the default prompt");
            DEFAULT_PROMPT
        }
    }
}

/// Copy of a user message with the model and provider tags removed from its text
fn without_tags(message: &Message) -> Message {
    if !message.is_user() {
        return message.clone();
    }

    let mut cleaned = message.clone();
    match &mut cleaned.content {
        MessageContent::Plain(text) => *text = strip_tags(text),
        MessageContent::Parts(parts) => {
            for part in parts.iter_mut().filter(|part| part.is_text()) {
                if let Some(text) = part.text.as_mut() {
                    *text = strip_tags(text);
                }
            }
        }
    }
    cleaned
}

/// Produces code for the (already enhanced) conversation
pub struct CodeGenerator {
    invoker: Arc<dyn ModelInvoker>,
    selector: Option<Arc<dyn ContextSelector>>,
    ignore: IgnoreSet,
    temperature: f32,
    max_tokens: Option<u32>,
    context_max_chars: usize,
    placement: ContextPlacement,
    accounting: UsageAccounting,
}

impl CodeGenerator {
    pub fn new(invoker: Arc<dyn ModelInvoker>) -> Self {
        Self {
            invoker,
            selector: None,
            ignore: IgnoreSet::default(),
            temperature: DEFAULT_GENERATOR_TEMPERATURE,
            max_tokens: None,
            context_max_chars: DEFAULT_CONTEXT_MAX_CHARS,
            placement: ContextPlacement::SystemPrompt,
            accounting: UsageAccounting::Reported,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn ContextSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreSet) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_context_max_chars(mut self, max_chars: usize) -> Self {
        self.context_max_chars = max_chars;
        self
    }

    pub fn with_placement(mut self, placement: ContextPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_usage_accounting(mut self, accounting: UsageAccounting) -> Self {
        self.accounting = accounting;
        self
    }

    async fn files_context(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<String> {
        let files = match ctx.files.as_deref() {
            Some(files) if !files.is_empty() => files,
            _ => return Ok(String::new()),
        };

        let selected: Cow<'_, FileMap> = match (&self.selector, ctx.context_optimization) {
            (Some(selector), true) => Cow::Owned(
                selector
                    .select(messages, files, ctx.summary.as_deref())
                    .await
                    .map_err(|e| PipelineError::Context(e.to_string()))?,
            ),
            _ => Cow::Borrowed(files),
        };

        Ok(create_files_context(
            &selected,
            &self.ignore,
            self.context_max_chars,
        ))
    }

    async fn generate(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<(String, Usage)> {
        if last_user_index(messages).is_none() {
            return Err(PipelineError::MissingUserMessage);
        }

        let info = ModelInfo::from_history(messages);
        let target = resolve_model(&info, ctx)?;

        let files_context = self.files_context(messages, ctx).await?;
        let in_prompt = match self.placement {
            ContextPlacement::SystemPrompt => files_context.as_str(),
            ContextPlacement::Message => "",
        };
        let system = load_embedded_prompt(
            prompt_template(ctx.prompt_id.as_deref()),
            &GeneratorPrompt {
                files_context: in_prompt,
            },
        )?;

        let mut request = Vec::with_capacity(messages.len() + 2);
        request.push(Message::system(system));
        request.extend(messages.iter().map(without_tags));
        if self.placement == ContextPlacement::Message && !files_context.is_empty() {
            request.push(Message::system(files_context));
        }

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: target.clamp_max_tokens(self.max_tokens),
        };

        tracing::debug!(
            provider = %target.kind,
            model = %target.model,
            messages = request.len(),
            "Invoking code generation model"
        );
        let completion = self.invoker.invoke(&request, &target, &options).await?;

        let usage = self.accounting.usage(
            completion.usage,
            &conversation_text(&request),
            &completion.text,
        );
        Ok((completion.text, usage))
    }
}

#[async_trait]
impl Agent for CodeGenerator {
    fn label(&self) -> &'static str {
        CODE_GEN_LABEL
    }

    async fn execute(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<AgentOutput> {
        let progress = StageProgress::start(
            ctx.sink.as_ref(),
            CODE_GEN_LABEL,
            ctx.progress_counter,
            "Generating code",
        );

        match self.generate(messages, ctx).await {
            Ok((text, usage)) => {
                tracing::info!(total_tokens = usage.total_tokens, "Code generated");
                let progress_counter = progress.complete("Code generated");
                Ok(AgentOutput {
                    output: StageOutput::Text(text),
                    usage: Some(usage),
                    progress_counter,
                })
            }
            Err(err) => {
                tracing::error!("Code generation failed: {}", err);
                progress.fail(&err);
                Err(err)
            }
        }
    }
}
