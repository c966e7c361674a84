use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::providers::base::{Completion, CompletionOptions};
use crate::resolver::{ModelInvoker, ResolvedModel};

/// One recorded call to the mock invoker
#[derive(Debug, Clone)]
pub struct MockCall {
    pub messages: Vec<Message>,
    pub target: ResolvedModel,
    pub options: CompletionOptions,
}

/// A mock invoker that returns pre-configured responses for testing.
/// An `Err` entry fails that call with the given message.
pub struct MockInvoker {
    responses: Mutex<Vec<Result<Completion, String>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockInvoker {
    pub fn new(responses: Vec<Result<Completion, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInvoker for MockInvoker {
    async fn invoke(
        &self,
        messages: &[Message],
        target: &ResolvedModel,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        self.calls.lock().unwrap().push(MockCall {
            messages: messages.to_vec(),
            target: target.clone(),
            options: *options,
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok(Completion::new("", None))
        } else {
            responses.remove(0).map_err(|e| anyhow!(e))
        }
    }
}
