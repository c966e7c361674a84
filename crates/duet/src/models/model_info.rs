use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::message::Message;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_PROVIDER: &str = "Anthropic";

lazy_static! {
    static ref MODEL_TAG: Regex = Regex::new(r"^\s*\[Model: (.*?)\]\s*").unwrap();
    static ref PROVIDER_TAG: Regex = Regex::new(r"\[Provider: (.*?)\]\s*").unwrap();
}

/// The model and provider a message asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model: String,
    pub provider_name: String,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: DEFAULT_PROVIDER.to_string(),
        }
    }
}

impl ModelInfo {
    pub fn new<M: Into<String>, P: Into<String>>(model: M, provider_name: P) -> Self {
        Self {
            model: model.into(),
            provider_name: provider_name.into(),
        }
    }

    /// Parse the model and provider tags out of message text, falling back to the defaults
    /// for whichever tag is absent
    pub fn from_text(text: &str) -> Self {
        let model = MODEL_TAG
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let provider_name = PROVIDER_TAG
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|p| p.as_str().trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

        Self {
            model,
            provider_name,
        }
    }

    /// Resolve from the newest message of a history, or the defaults for an empty one
    pub fn from_history(messages: &[Message]) -> Self {
        messages
            .last()
            .map(|message| Self::from_text(message.text()))
            .unwrap_or_default()
    }

    /// Prefix `text` with the tags for this selection
    pub fn embed(&self, text: &str) -> String {
        format!(
            "[Model: {}]\n\n[Provider: {}]\n\n{}",
            self.model, self.provider_name, text
        )
    }
}

/// Remove model and provider tags from message text
pub fn strip_tags(text: &str) -> String {
    let without_model = MODEL_TAG.replace(text, "");
    PROVIDER_TAG.replace_all(&without_model, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline_tags() {
        let info = ModelInfo::from_text("[Model: gpt-4][Provider: openai] write a fibonacci function");
        assert_eq!(info, ModelInfo::new("gpt-4", "openai"));
    }

    #[test]
    fn test_embed_round_trip() {
        for (model, provider) in [
            ("gpt-4o", "OpenAI"),
            ("claude-3-5-sonnet-latest", "Anthropic"),
            ("meta-llama/llama-3.1-70b-instruct", "OpenRouter"),
        ] {
            let info = ModelInfo::new(model, provider);
            let embedded = info.embed("do something");
            assert_eq!(ModelInfo::from_text(&embedded), info);
            assert_eq!(strip_tags(&embedded), "do something");
        }
    }

    #[test]
    fn test_defaults_without_tags() {
        let info = ModelInfo::from_text("no tags at all");
        assert_eq!(info, ModelInfo::default());
    }

    #[test]
    fn test_model_tag_must_lead() {
        let info = ModelInfo::from_text("please use [Model: gpt-4] for this");
        assert_eq!(info.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_strip_tags_leaves_plain_text() {
        assert_eq!(strip_tags("hello world"), "hello world");
        assert_eq!(
            strip_tags("[Model: gpt-4]\n\n[Provider: OpenAI]\n\nbuild a todo app"),
            "build a todo app"
        );
    }

    #[test]
    fn test_from_history_uses_newest_message() {
        let messages = vec![
            Message::user("[Model: gpt-4]\n\n[Provider: OpenAI]\n\nhi"),
            Message::system("[Model: llama3]\n\n[Provider: Ollama]\n\nsystem note"),
        ];
        assert_eq!(
            ModelInfo::from_history(&messages),
            ModelInfo::new("llama3", "Ollama")
        );
        assert_eq!(ModelInfo::from_history(&[]), ModelInfo::default());
    }
}
