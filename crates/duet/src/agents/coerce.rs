//! Best-effort conversion of a stage's output into plain text.

use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// How many pending layers are awaited before giving up with an empty string
pub const MAX_PENDING_DEPTH: usize = 2;

/// What a stage hands back: usually text, but possibly a JSON value or a value
/// that has not settled yet
pub enum StageOutput {
    Text(String),
    Json(Value),
    Pending(BoxFuture<'static, StageOutput>),
}

impl StageOutput {
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = StageOutput> + Send + 'static,
    {
        StageOutput::Pending(Box::pin(future))
    }
}

impl fmt::Debug for StageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutput::Text(text) => f.debug_tuple("Text").field(text).finish(),
            StageOutput::Json(value) => f.debug_tuple("Json").field(value).finish(),
            StageOutput::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl From<String> for StageOutput {
    fn from(text: String) -> Self {
        StageOutput::Text(text)
    }
}

impl From<&str> for StageOutput {
    fn from(text: &str) -> Self {
        StageOutput::Text(text.to_string())
    }
}

impl From<Value> for StageOutput {
    fn from(value: Value) -> Self {
        StageOutput::Json(value)
    }
}

fn json_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Collapse a stage output into a definite string. Never fails: null becomes empty,
/// other JSON is serialized, pending values are awaited up to [`MAX_PENDING_DEPTH`] layers.
pub async fn coerce_to_text(output: StageOutput) -> String {
    let mut current = output;
    let mut depth = 0;

    loop {
        match current {
            StageOutput::Text(text) => return text,
            StageOutput::Json(value) => return json_to_text(value),
            StageOutput::Pending(future) => {
                if depth == MAX_PENDING_DEPTH {
                    tracing::warn!(depth, "Stage output still pending, using empty text");
                    return String::new();
                }
                depth += 1;
                current = future.await;
            }
        }
    }
}
