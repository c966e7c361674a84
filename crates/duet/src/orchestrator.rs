use std::fmt;
use std::sync::Arc;

use crate::agents::{coerce_to_text, Agent, AgentContext};
use crate::errors::{PipelineError, PipelineResult};
use crate::events::DataEvent;
use crate::models::message::{last_user_message, replace_last_user_message, Message};
use crate::models::model_info::ModelInfo;
use crate::progress::report_usage;
use crate::providers::base::Usage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Enhancing,
    Generating,
    Done,
    Error,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Enhancing => "enhancing",
            PipelineState::Generating => "generating",
            PipelineState::Done => "done",
            PipelineState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorResult {
    pub text: String,
    pub usage: Usage,
}

/// Runs the enhancer and then the code generator on one request
pub struct Orchestrator {
    enhancer: Arc<dyn Agent>,
    generator: Arc<dyn Agent>,
}

impl Orchestrator {
    pub fn new(enhancer: Arc<dyn Agent>, generator: Arc<dyn Agent>) -> Self {
        Self {
            enhancer,
            generator,
        }
    }

    pub fn enhancer(&self) -> Arc<dyn Agent> {
        Arc::clone(&self.enhancer)
    }

    /// Enhance the newest user request, substitute it into the history and generate from
    /// the result. Either stage failing fails the whole run; nothing is retried.
    pub async fn run(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<OrchestratorResult> {
        let original = last_user_message(messages).ok_or(PipelineError::MissingUserMessage)?;
        // The comparison shows the request exactly as the user sent it, tags included
        let original_text = original.text().to_string();
        let info = ModelInfo::from_history(messages);
        tracing::info!(model = %info.model, provider = %info.provider_name, "Starting pipeline");

        let mut state = PipelineState::Enhancing;
        tracing::debug!(%state, "Pipeline state");
        let enhanced = match self.enhancer.execute(messages, ctx).await {
            Ok(enhanced) => enhanced,
            Err(err) => return Err(fail(state, err)),
        };
        let enhanced_text = coerce_to_text(enhanced.output).await;

        ctx.sink.write_data(DataEvent::PromptComparison {
            original: original_text,
            enhanced: enhanced_text.clone(),
        });

        let replacement = Message::user(info.embed(&enhanced_text));
        let updated = replace_last_user_message(messages, replacement);
        let generator_ctx = ctx
            .clone()
            .with_progress_counter(enhanced.progress_counter);

        state = PipelineState::Generating;
        tracing::debug!(%state, "Pipeline state");
        let generated = match self.generator.execute(&updated, &generator_ctx).await {
            Ok(generated) => generated,
            Err(err) => return Err(fail(state, err)),
        };
        let text = coerce_to_text(generated.output).await;
        let usage = Usage::combine(enhanced.usage, generated.usage);

        ctx.sink.write_text(&text);
        report_usage(ctx.sink.as_ref(), usage);

        state = PipelineState::Done;
        tracing::info!(
            %state,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "Pipeline finished"
        );
        Ok(OrchestratorResult { text, usage })
    }
}

fn fail(from: PipelineState, err: PipelineError) -> PipelineError {
    tracing::error!(%from, state = %PipelineState::Error, "Pipeline failed: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentOutput, CodeGenerator, PromptEnhancer, StageOutput};
    use crate::events::{CollectingSink, ProgressStatus, SinkEvent};
    use crate::key_manager::RequestEnvironment;
    use crate::models::role::Role;
    use crate::providers::base::Completion;
    use crate::providers::factory::ProviderKind;
    use crate::providers::mock::MockInvoker;
    use async_trait::async_trait;
    use serde_json::json;

    fn context(sink: Arc<CollectingSink>) -> AgentContext {
        AgentContext::new(sink)
            .with_process_env(Arc::new(RequestEnvironment::default()))
            .with_api_key("OpenAI", "sk-test")
    }

    fn orchestrator(invoker: Arc<MockInvoker>) -> Orchestrator {
        Orchestrator::new(
            Arc::new(PromptEnhancer::new(invoker.clone())),
            Arc::new(CodeGenerator::new(invoker)),
        )
    }

    /// Delegates to another agent and keeps the histories it was given
    struct RecordingAgent {
        inner: Arc<dyn Agent>,
        seen: std::sync::Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl Agent for RecordingAgent {
        fn label(&self) -> &'static str {
            self.inner.label()
        }

        async fn execute(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<AgentOutput> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.inner.execute(messages, ctx).await
        }
    }

    fn fibonacci_request() -> Vec<Message> {
        vec![
            Message::system("You are helpful"),
            Message::user("[Model: gpt-4][Provider: openai] write a fibonacci function"),
        ]
    }

    #[tokio::test]
    async fn test_fibonacci_scenario() -> PipelineResult<()> {
        let enhanced = "Write a Rust function `fib(n: u64) -> u64` computing Fibonacci numbers iteratively.";
        let code = "pub fn fib(n: u64) -> u64 {\n    let (mut a, mut b) = (0, 1);\n    for _ in 0..n {\n        (a, b) = (b, a + b);\n    }\n    a\n}";
        let invoker = Arc::new(MockInvoker::new(vec![
            Ok(Completion::new(enhanced, None)),
            Ok(Completion::new(code, None)),
        ]));
        let sink = Arc::new(CollectingSink::new());
        let messages = fibonacci_request();

        let enhancer = Arc::new(RecordingAgent {
            inner: Arc::new(PromptEnhancer::new(invoker.clone())),
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let result = Orchestrator::new(enhancer.clone(), Arc::new(CodeGenerator::new(invoker.clone())))
            .run(&messages, &context(sink.clone()))
            .await?;
        assert_eq!(result.text, code);
        assert_eq!(*enhancer.seen.lock().unwrap(), vec![messages.clone()]);

        let calls = invoker.calls();
        assert_eq!(calls.len(), 2);
        for call in &calls {
            assert_eq!(call.target.kind, ProviderKind::OpenAi);
            assert_eq!(call.target.model, "gpt-4");
        }
        assert_eq!(calls[1].messages.last().map(Message::text), Some(enhanced));

        let estimates = Usage::estimate(calls[0].messages[0].text(), enhanced).total_tokens
            + Usage::estimate(calls[1].messages[0].text(), code).total_tokens;
        assert!(result.usage.total_tokens >= estimates);

        let events = sink.events();
        assert!(events.contains(&SinkEvent::Data(DataEvent::PromptComparison {
            original: "[Model: gpt-4][Provider: openai] write a fibonacci function".to_string(),
            enhanced: enhanced.to_string(),
        })));
        assert_eq!(sink.text(), code);
        assert_eq!(
            events.last(),
            Some(&SinkEvent::Annotation(DataEvent::Usage {
                value: result.usage
            }))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_usage_is_summed() -> PipelineResult<()> {
        let invoker = Arc::new(MockInvoker::new(vec![
            Ok(Completion::new("better", Some(Usage::new(10, 5, 15)))),
            Ok(Completion::new("code", Some(Usage::new(100, 40, 140)))),
        ]));
        let sink = Arc::new(CollectingSink::new());

        let result = orchestrator(invoker)
            .run(&fibonacci_request(), &context(sink))
            .await?;
        assert_eq!(result.usage, Usage::new(110, 45, 155));
        Ok(())
    }

    #[tokio::test]
    async fn test_progress_is_contiguous() -> PipelineResult<()> {
        let invoker = Arc::new(MockInvoker::new(vec![
            Ok(Completion::new("better", None)),
            Ok(Completion::new("code", None)),
        ]));
        let sink = Arc::new(CollectingSink::new());
        let ctx = context(sink.clone()).with_progress_counter(7);

        orchestrator(invoker).run(&fibonacci_request(), &ctx).await?;

        let progress = sink.progress();
        let orders: Vec<u32> = progress.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![8, 9, 10, 11]);
        let labels: Vec<&str> = progress.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["enhance", "enhance", "code-gen", "code-gen"]);
        assert_eq!(progress[3].status, ProgressStatus::Complete);
        Ok(())
    }

    #[tokio::test]
    async fn test_only_last_user_message_replaced() -> PipelineResult<()> {
        let invoker = Arc::new(MockInvoker::new(vec![
            Ok(Completion::new("enhanced request", None)),
            Ok(Completion::new("code", None)),
        ]));
        let sink = Arc::new(CollectingSink::new());
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("[Model: gpt-4]\n\n[Provider: OpenAI]\n\nfirst"),
            Message::assistant("answer"),
            Message::user("[Model: gpt-4]\n\n[Provider: OpenAI]\n\nsecond"),
            Message::assistant("[Model: gpt-4]\n\n[Provider: OpenAI]\n\ntrailing"),
        ];

        orchestrator(invoker.clone())
            .run(&messages, &context(sink))
            .await?;

        // the generator sees its system prompt followed by the rewritten history
        let sent = &invoker.calls()[1].messages[1..];
        assert_eq!(sent.len(), messages.len());
        for idx in [0, 2, 4] {
            assert_eq!(sent[idx].id, messages[idx].id);
        }
        assert_eq!(sent[1].text(), "first");
        assert_eq!(sent[3].role, Role::User);
        assert_ne!(sent[3].id, messages[3].id);
        assert_eq!(sent[3].text(), "enhanced request");
        Ok(())
    }

    #[tokio::test]
    async fn test_no_user_message_rejected_before_any_event() {
        let invoker = Arc::new(MockInvoker::new(vec![]));
        let sink = Arc::new(CollectingSink::new());

        let err = orchestrator(invoker.clone())
            .run(&[Message::system("You are helpful")], &context(sink.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingUserMessage));
        assert!(invoker.calls().is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_enhancer_failure_aborts() {
        let invoker = Arc::new(MockInvoker::new(vec![Err(
            "Request failed: 400 - bad request".to_string(),
        )]));
        let sink = Arc::new(CollectingSink::new());

        let err = orchestrator(invoker.clone())
            .run(&fibonacci_request(), &context(sink.clone()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Request failed: 400 - bad request");
        assert_eq!(invoker.calls().len(), 1);
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, SinkEvent::Data(DataEvent::PromptComparison { .. }))));
    }

    #[tokio::test]
    async fn test_generator_key_missing_still_compares() {
        struct FixedEnhancer;

        #[async_trait]
        impl Agent for FixedEnhancer {
            fn label(&self) -> &'static str {
                "enhance"
            }

            async fn execute(&self, _messages: &[Message], ctx: &AgentContext) -> PipelineResult<AgentOutput> {
                Ok(AgentOutput {
                    output: StageOutput::Text("an enhanced prompt".to_string()),
                    usage: None,
                    progress_counter: ctx.progress_counter + 2,
                })
            }
        }

        let invoker = Arc::new(MockInvoker::new(vec![]));
        let sink = Arc::new(CollectingSink::new());
        let orchestrator = Orchestrator::new(
            Arc::new(FixedEnhancer),
            Arc::new(CodeGenerator::new(invoker.clone())),
        );
        let messages = [Message::user(
            ModelInfo::new("claude-3-opus", "Anthropic").embed("build it"),
        )];

        let err = orchestrator
            .run(&messages, &context(sink.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingApiKey { ref provider } if provider == "Anthropic"));
        assert!(invoker.calls().is_empty());
        assert!(sink.events().contains(&SinkEvent::Data(DataEvent::PromptComparison {
            original: messages[0].text().to_string(),
            enhanced: "an enhanced prompt".to_string(),
        })));
        let progress = sink.progress();
        assert_eq!(progress.last().map(|p| p.status), Some(ProgressStatus::Error));
        assert_eq!(progress.last().map(|p| p.order), Some(4));
    }

    #[tokio::test]
    async fn test_pending_outputs_are_coerced() -> PipelineResult<()> {
        struct PendingEnhancer;

        #[async_trait]
        impl Agent for PendingEnhancer {
            fn label(&self) -> &'static str {
                "enhance"
            }

            async fn execute(&self, _messages: &[Message], ctx: &AgentContext) -> PipelineResult<AgentOutput> {
                let inner = StageOutput::pending(async { StageOutput::from("nested prompt") });
                Ok(AgentOutput {
                    output: StageOutput::pending(async move { inner }),
                    usage: Some(Usage::new(1, 1, 2)),
                    progress_counter: ctx.progress_counter + 2,
                })
            }
        }

        struct JsonGenerator;

        #[async_trait]
        impl Agent for JsonGenerator {
            fn label(&self) -> &'static str {
                "code-gen"
            }

            async fn execute(&self, messages: &[Message], ctx: &AgentContext) -> PipelineResult<AgentOutput> {
                let prompt = messages.last().map(|m| m.text().to_string()).unwrap_or_default();
                Ok(AgentOutput {
                    output: StageOutput::pending(async move { json!({ "prompt": prompt }).into() }),
                    usage: None,
                    progress_counter: ctx.progress_counter + 2,
                })
            }
        }

        let sink = Arc::new(CollectingSink::new());
        let result = Orchestrator::new(Arc::new(PendingEnhancer), Arc::new(JsonGenerator))
            .run(&[Message::user("hi")], &context(sink))
            .await?;

        let expected = json!({ "prompt": ModelInfo::default().embed("nested prompt") }).to_string();
        assert_eq!(result.text, expected);
        assert_eq!(result.usage, Usage::new(1, 1, 2));
        Ok(())
    }
}
