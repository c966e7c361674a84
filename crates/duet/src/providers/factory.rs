use super::{
    anthropic::AnthropicProvider,
    base::Provider,
    configs::{AnthropicProviderConfig, OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig},
    ollama::OllamaProvider,
    openai::OpenAiProvider,
};
use anyhow::Result;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

#[derive(EnumIter, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    #[strum(to_string = "OpenAI")]
    OpenAi,
    Anthropic,
    Ollama,
    Groq,
    Deepseek,
    OpenRouter,
}

impl ProviderKind {
    /// Look up a provider by display name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        ProviderKind::iter().find(|kind| kind.to_string().eq_ignore_ascii_case(name))
    }

    /// Name of the environment variable holding this provider's key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Ollama => "OLLAMA_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Deepseek => "DEEPSEEK_API_KEY",
            ProviderKind::OpenRouter => "OPEN_ROUTER_API_KEY",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    pub fn default_host(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Ollama => super::ollama::OLLAMA_HOST,
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Deepseek => "https://api.deepseek.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Anthropic => crate::models::model_info::DEFAULT_MODEL,
            ProviderKind::Ollama => super::ollama::OLLAMA_MODEL,
            ProviderKind::Groq => "llama-3.1-70b-versatile",
            ProviderKind::Deepseek => "deepseek-coder",
            ProviderKind::OpenRouter => "anthropic/claude-3.5-sonnet",
        }
    }

    /// Build the client configuration for this provider
    pub fn config(&self, host: Option<&str>, api_key: &str, model: &str) -> ProviderConfig {
        let host = host.unwrap_or(self.default_host()).to_string();
        match self {
            ProviderKind::Anthropic => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key: api_key.to_string(),
                model: model.to_string(),
            }),
            ProviderKind::Ollama => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model: model.to_string(),
            }),
            ProviderKind::OpenAi
            | ProviderKind::Groq
            | ProviderKind::Deepseek
            | ProviderKind::OpenRouter => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key: api_key.to_string(),
                model: model.to_string(),
            }),
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider + Send + Sync>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Box::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::Ollama(ollama_config) => Ok(Box::new(OllamaProvider::new(ollama_config)?)),
    }
}
