use std::collections::HashMap;
use std::sync::Arc;

use crate::events::OutputSink;
use crate::files::FileMap;
use crate::key_manager::{Environment, ProcessEnvironment, RequestEnvironment};
use crate::providers::configs::ProviderSettings;

/// Everything one request threads through both stages. Each request builds its own.
/// Clones share the request data and differ only in their progress counter.
#[derive(Clone)]
pub struct AgentContext {
    pub env: Arc<dyn Environment>,
    pub process_env: Arc<dyn Environment>,
    pub api_keys: Arc<HashMap<String, String>>,
    pub provider_settings: Arc<HashMap<String, ProviderSettings>>,
    pub files: Option<Arc<FileMap>>,
    pub prompt_id: Option<String>,
    pub summary: Option<String>,
    pub context_optimization: bool,
    pub sink: Arc<dyn OutputSink>,
    pub progress_counter: u32,
}

impl AgentContext {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            env: Arc::new(RequestEnvironment::default()),
            process_env: Arc::new(ProcessEnvironment),
            api_keys: Arc::new(HashMap::new()),
            provider_settings: Arc::new(HashMap::new()),
            files: None,
            prompt_id: None,
            summary: None,
            context_optimization: false,
            sink,
            progress_counter: 0,
        }
    }

    pub fn with_env(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    pub fn with_process_env(mut self, env: Arc<dyn Environment>) -> Self {
        self.process_env = env;
        self
    }

    pub fn with_api_keys(mut self, api_keys: HashMap<String, String>) -> Self {
        self.api_keys = Arc::new(api_keys);
        self
    }

    pub fn with_api_key<P: Into<String>, K: Into<String>>(mut self, provider: P, key: K) -> Self {
        Arc::make_mut(&mut self.api_keys).insert(provider.into(), key.into());
        self
    }

    pub fn with_provider_settings(mut self, settings: HashMap<String, ProviderSettings>) -> Self {
        self.provider_settings = Arc::new(settings);
        self
    }

    pub fn with_files(mut self, files: FileMap) -> Self {
        self.files = Some(Arc::new(files));
        self
    }

    pub fn with_prompt_id<S: Into<String>>(mut self, prompt_id: S) -> Self {
        self.prompt_id = Some(prompt_id.into());
        self
    }

    pub fn with_summary<S: Into<String>>(mut self, summary: S) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_context_optimization(mut self, enabled: bool) -> Self {
        self.context_optimization = enabled;
        self
    }

    pub fn with_progress_counter(mut self, counter: u32) -> Self {
        self.progress_counter = counter;
        self
    }

    /// Settings for a provider, matched by display name ignoring case
    pub fn settings_for(&self, provider_name: &str) -> Option<&ProviderSettings> {
        self.provider_settings.get(provider_name).or_else(|| {
            self.provider_settings
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(provider_name))
                .map(|(_, settings)| settings)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::files::FileEntry;

    #[test]
    fn test_counter_change_shares_request_data() {
        let ctx = AgentContext::new(Arc::new(NullSink))
            .with_api_key("OpenAI", "sk-test")
            .with_files(FileMap::from([(
                "/home/project/index.js".to_string(),
                FileEntry::text("console.log('hi')"),
            )]));

        let next = ctx.clone().with_progress_counter(2);

        assert_eq!(next.progress_counter, 2);
        assert_eq!(ctx.progress_counter, 0);
        assert!(Arc::ptr_eq(&ctx.api_keys, &next.api_keys));
        assert!(Arc::ptr_eq(&ctx.provider_settings, &next.provider_settings));
        match (&ctx.files, &next.files) {
            (Some(a), Some(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("files missing from context"),
        }
    }

    #[test]
    fn test_adding_key_after_clone_leaves_original() {
        let ctx = AgentContext::new(Arc::new(NullSink)).with_api_key("OpenAI", "sk-test");
        let extended = ctx.clone().with_api_key("Anthropic", "sk-ant");

        assert_eq!(ctx.api_keys.len(), 1);
        assert_eq!(extended.api_keys.len(), 2);
    }

    #[test]
    fn test_settings_lookup_ignores_case() {
        let ctx = AgentContext::new(Arc::new(NullSink)).with_provider_settings(HashMap::from([(
            "openai".to_string(),
            ProviderSettings::default(),
        )]));
        assert!(ctx.settings_for("OpenAI").is_some());
        assert!(ctx.settings_for("Groq").is_none());
    }
}
