pub mod base;
pub mod code_generator;
pub mod coerce;
pub mod context;
pub mod enhancer;

pub use base::{Agent, AgentOutput, UsageAccounting};
pub use code_generator::{CodeGenerator, ContextPlacement};
pub use coerce::{coerce_to_text, StageOutput};
pub use context::AgentContext;
pub use enhancer::PromptEnhancer;
