use duet::agents::AgentContext;
use duet::events::OutputSink;
use duet::files::FileMap;
use duet::models::message::Message;
use duet::providers::configs::ProviderSettings;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Body shared by the chat and enhancer endpoints, in the shape the chat client posts
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    #[serde(default)]
    pub provider_settings: HashMap<String, ProviderSettings>,
    #[serde(default)]
    pub files: Option<FileMap>,
    #[serde(default)]
    pub prompt_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub context_optimization: Option<bool>,
}

impl ChatRequest {
    /// Split into the messages and a context writing to `sink`
    pub fn into_parts(
        self,
        sink: Arc<dyn OutputSink>,
        default_optimization: bool,
    ) -> (Vec<Message>, AgentContext) {
        let mut ctx = AgentContext::new(sink)
            .with_api_keys(self.api_keys)
            .with_provider_settings(self.provider_settings)
            .with_context_optimization(self.context_optimization.unwrap_or(default_optimization));
        if let Some(files) = self.files {
            ctx = ctx.with_files(files);
        }
        if let Some(prompt_id) = self.prompt_id {
            ctx = ctx.with_prompt_id(prompt_id);
        }
        if let Some(summary) = self.summary {
            ctx = ctx.with_summary(summary);
        }
        (self.messages, ctx)
    }
}
