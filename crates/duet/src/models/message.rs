use super::content::{ContentPart, MessageContent};
use super::role::Role;
use serde::{Deserialize, Serialize};

fn new_id() -> String {
    nanoid::nanoid!()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM
pub struct Message {
    #[serde(default = "new_id")]
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Message {
            id: new_id(),
            role,
            content,
        }
    }

    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::new(Role::System, MessageContent::plain(text))
    }

    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, MessageContent::plain(text))
    }

    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Assistant, MessageContent::plain(text))
    }

    /// Create a user message from a list of typed parts
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, MessageContent::Parts(parts))
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    pub fn text(&self) -> &str {
        self.content.text()
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Index of the most recent user message, scanning from the end
pub fn last_user_index(messages: &[Message]) -> Option<usize> {
    messages.iter().rposition(Message::is_user)
}

/// The most recent user message, scanning from the end
pub fn last_user_message(messages: &[Message]) -> Option<&Message> {
    last_user_index(messages).map(|idx| &messages[idx])
}

/// Returns a new history where the last user message is replaced by `replacement`.
/// When the history holds no user message the replacement is appended instead.
pub fn replace_last_user_message(messages: &[Message], replacement: Message) -> Vec<Message> {
    let mut updated = messages.to_vec();
    match last_user_index(messages) {
        Some(idx) => updated[idx] = replacement,
        None => updated.push(replacement),
    }
    updated
}
