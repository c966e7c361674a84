//! Assembles an [`Orchestrator`] for one of the two pipeline variants.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::agents::code_generator::{DEFAULT_CONTEXT_MAX_CHARS, DEFAULT_GENERATOR_TEMPERATURE};
use crate::agents::enhancer::DEFAULT_ENHANCER_TEMPERATURE;
use crate::agents::{CodeGenerator, ContextPlacement, PromptEnhancer, UsageAccounting};
use crate::context_selection::ContextSelector;
use crate::errors::{PipelineError, PipelineResult};
use crate::files::IgnoreSet;
use crate::orchestrator::Orchestrator;
use crate::resolver::ModelInvoker;

pub const DEFAULT_MAX_TOKENS: u32 = 8000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Files in the system prompt, provider-reported usage
    #[default]
    Direct,
    /// Files as a trailing system message, estimated usage
    Chain,
}

impl PipelineKind {
    fn placement(&self) -> ContextPlacement {
        match self {
            PipelineKind::Direct => ContextPlacement::SystemPrompt,
            PipelineKind::Chain => ContextPlacement::Message,
        }
    }

    fn accounting(&self) -> UsageAccounting {
        match self {
            PipelineKind::Direct => UsageAccounting::Reported,
            PipelineKind::Chain => UsageAccounting::Estimated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub kind: PipelineKind,
    pub enhancer_temperature: f32,
    pub generator_temperature: f32,
    pub max_tokens: Option<u32>,
    pub context_max_chars: usize,
    /// Used when a request does not say whether to narrow its files
    pub context_optimization: bool,
    /// Replaces the built-in ignore list when set
    pub ignore_patterns: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kind: PipelineKind::default(),
            enhancer_temperature: DEFAULT_ENHANCER_TEMPERATURE,
            generator_temperature: DEFAULT_GENERATOR_TEMPERATURE,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            context_max_chars: DEFAULT_CONTEXT_MAX_CHARS,
            context_optimization: false,
            ignore_patterns: None,
        }
    }
}

impl PipelineConfig {
    fn ignore_set(&self) -> PipelineResult<IgnoreSet> {
        match &self.ignore_patterns {
            Some(patterns) => IgnoreSet::new(patterns.as_slice())
                .map_err(|e| PipelineError::Context(format!("Invalid ignore pattern: {}", e))),
            None => Ok(IgnoreSet::default()),
        }
    }
}

pub fn build_enhancer(config: &PipelineConfig, invoker: Arc<dyn ModelInvoker>) -> PromptEnhancer {
    PromptEnhancer::new(invoker)
        .with_temperature(config.enhancer_temperature)
        .with_max_tokens(config.max_tokens)
        .with_usage_accounting(config.kind.accounting())
}

pub fn build_generator(
    config: &PipelineConfig,
    invoker: Arc<dyn ModelInvoker>,
    selector: Option<Arc<dyn ContextSelector>>,
) -> PipelineResult<CodeGenerator> {
    let mut generator = CodeGenerator::new(invoker)
        .with_ignore(config.ignore_set()?)
        .with_temperature(config.generator_temperature)
        .with_max_tokens(config.max_tokens)
        .with_context_max_chars(config.context_max_chars)
        .with_placement(config.kind.placement())
        .with_usage_accounting(config.kind.accounting());
    if let Some(selector) = selector {
        generator = generator.with_selector(selector);
    }
    Ok(generator)
}

/// Wire both stages for the configured variant
pub fn build_orchestrator(
    config: &PipelineConfig,
    invoker: Arc<dyn ModelInvoker>,
    selector: Option<Arc<dyn ContextSelector>>,
) -> PipelineResult<Orchestrator> {
    tracing::debug!(kind = ?config.kind, "Building pipeline");
    let enhancer = build_enhancer(config, Arc::clone(&invoker));
    let generator = build_generator(config, invoker, selector)?;
    Ok(Orchestrator::new(Arc::new(enhancer), Arc::new(generator)))
}
