//! Events written to the caller while a request runs.
//!
//! The sink receives three kinds of writes, in the order they are issued: raw text chunks,
//! structured data events and message annotations. Transports decide how to frame them.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::providers::base::Usage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    InProgress,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressAnnotation {
    pub label: String,
    pub status: ProgressStatus,
    pub order: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

/// Structured event carried on the data channel or as a message annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DataEvent {
    Progress(ProgressAnnotation),
    PromptComparison { original: String, enhanced: String },
    Usage { value: Usage },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Text(String),
    Data(DataEvent),
    Annotation(DataEvent),
}

/// Destination for everything a request reports back to its caller
pub trait OutputSink: Send + Sync {
    fn write(&self, event: SinkEvent);

    fn write_text(&self, text: &str) {
        self.write(SinkEvent::Text(text.to_string()));
    }

    fn write_data(&self, event: DataEvent) {
        self.write(SinkEvent::Data(event));
    }

    fn write_annotation(&self, event: DataEvent) {
        self.write(SinkEvent::Annotation(event));
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Progress annotations written on the data channel, in order
    pub fn progress(&self) -> Vec<ProgressAnnotation> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Data(DataEvent::Progress(progress)) => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn text(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl OutputSink for CollectingSink {
    fn write(&self, event: SinkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Forwards events to a channel, typically drained by a streaming response
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SinkEvent>) -> Self {
        Self { tx }
    }
}

impl OutputSink for ChannelSink {
    fn write(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Output channel closed, dropping event");
        }
    }
}

/// Discards every event
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&self, _event: SinkEvent) {}
}
