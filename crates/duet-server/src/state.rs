use duet::context_selection::{ContextSelector, PathMentionSelector};
use duet::errors::PipelineResult;
use duet::orchestrator::Orchestrator;
use duet::pipeline::{build_orchestrator, PipelineConfig};
use duet::resolver::ModelInvoker;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Applied when a request does not set its own flag
    pub context_optimization: bool,
}

impl AppState {
    pub fn new(config: &PipelineConfig, invoker: Arc<dyn ModelInvoker>) -> PipelineResult<Self> {
        let selector: Arc<dyn ContextSelector> = Arc::new(PathMentionSelector);
        let orchestrator = build_orchestrator(config, invoker, Some(selector))?;
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            context_optimization: config.context_optimization,
        })
    }
}
