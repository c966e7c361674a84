//! Turns the model/provider selection carried by a message into a callable model client.

use anyhow::Result;
use async_trait::async_trait;

use crate::agents::context::AgentContext;
use crate::errors::{PipelineError, PipelineResult};
use crate::key_manager::get_api_key;
use crate::models::message::Message;
use crate::models::model_info::ModelInfo;
use crate::providers::base::{Completion, CompletionOptions, Provider};
use crate::providers::configs::{ProviderConfig, ProviderSettings};
use crate::providers::factory::{get_provider, ProviderKind};

/// Tried first when a message names a provider we do not know
pub const FALLBACK_PROVIDER: ProviderKind = ProviderKind::Anthropic;
/// Tried when the first fallback has no key either
pub const SECONDARY_FALLBACK_PROVIDER: ProviderKind = ProviderKind::OpenAi;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
}

impl ResolvedModel {
    pub fn config(&self) -> ProviderConfig {
        self.kind
            .config(self.base_url.as_deref(), &self.api_key, &self.model)
    }

    pub fn client(&self) -> Result<Box<dyn Provider + Send + Sync>> {
        get_provider(self.config())
    }

    /// The smaller of the configured limit and the provider's own, when both exist
    pub fn clamp_max_tokens(&self, configured: Option<u32>) -> Option<u32> {
        match (configured, self.max_tokens) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

fn lookup_key(kind: ProviderKind, ctx: &AgentContext) -> Option<String> {
    let found = get_api_key(
        &kind.to_string(),
        kind.api_key_env(),
        &ctx.api_keys,
        ctx.env.as_ref(),
        ctx.process_env.as_ref(),
    );
    match found {
        Some((key, source)) => {
            tracing::debug!(provider = %kind, ?source, "Resolved API key");
            Some(key)
        }
        None if !kind.requires_api_key() => Some(String::new()),
        None => None,
    }
}

fn select_model(kind: ProviderKind, requested: &str, settings: Option<&ProviderSettings>) -> String {
    let requested = if requested.trim().is_empty() {
        kind.default_model()
    } else {
        requested
    };

    match settings.map(|s| &s.models) {
        Some(models) if !models.is_empty() && !models.iter().any(|m| m == requested) => {
            tracing::warn!(
                provider = %kind,
                requested,
                using = %models[0],
                "Model not available for provider, using first listed model"
            );
            models[0].clone()
        }
        _ => requested.to_string(),
    }
}

fn build(kind: ProviderKind, requested_model: &str, api_key: String, ctx: &AgentContext) -> ResolvedModel {
    let settings = ctx.settings_for(&kind.to_string());
    ResolvedModel {
        kind,
        model: select_model(kind, requested_model, settings),
        api_key,
        base_url: settings.and_then(|s| s.base_url.clone()),
        max_tokens: settings.and_then(|s| s.max_tokens),
    }
}

/// Resolve the provider, model and API key for a selection.
///
/// A known provider without a key is a hard failure. An unknown provider falls back to
/// [`FALLBACK_PROVIDER`] and then [`SECONDARY_FALLBACK_PROVIDER`], each with its default model,
/// and only when that provider has a key.
pub fn resolve_model(info: &ModelInfo, ctx: &AgentContext) -> PipelineResult<ResolvedModel> {
    if let Some(kind) = ProviderKind::from_name(&info.provider_name) {
        let api_key = lookup_key(kind, ctx).ok_or_else(|| PipelineError::MissingApiKey {
            provider: kind.to_string(),
        })?;
        return Ok(build(kind, &info.model, api_key, ctx));
    }

    tracing::warn!(provider = %info.provider_name, "Unrecognized provider, trying fallbacks");
    for kind in [FALLBACK_PROVIDER, SECONDARY_FALLBACK_PROVIDER] {
        if let Some(api_key) = lookup_key(kind, ctx) {
            tracing::info!(provider = %kind, model = kind.default_model(), "Using fallback provider");
            return Ok(build(kind, kind.default_model(), api_key, ctx));
        }
    }

    Err(PipelineError::MissingApiKey {
        provider: info.provider_name.clone(),
    })
}

/// Invokes a resolved model with a conversation
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        target: &ResolvedModel,
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

/// Calls the provider's HTTP API through the client the factory builds
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderInvoker;

#[async_trait]
impl ModelInvoker for ProviderInvoker {
    async fn invoke(
        &self,
        messages: &[Message],
        target: &ResolvedModel,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let client = target.client()?;
        client.complete(messages, options).await
    }
}
