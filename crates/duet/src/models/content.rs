use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ContentPart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image<S: Into<String>>(data: S) -> Self {
        Self {
            kind: "image".to_string(),
            text: None,
            image: Some(data.into()),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }
}

/// Content of a chat message, either a bare string or a list of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Plain(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn plain<S: Into<String>>(text: S) -> Self {
        MessageContent::Plain(text.into())
    }

    /// The plain text of this content: the string itself, or the first text-typed part.
    /// Returns an empty string when there is no text at all.
    pub fn text(&self) -> &str {
        match self {
            MessageContent::Plain(text) => text,
            MessageContent::Parts(parts) => parts
                .iter()
                .find(|part| part.is_text())
                .and_then(|part| part.text.as_deref())
                .unwrap_or(""),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Plain(String::new())
    }
}
