//! These models represent the objects passed between the pipeline stages
//!
//! Messages arrive from the chat interface in the useChat shape, where `content` is either a
//! plain string or a list of typed parts. We keep that shape as a tagged variant rather than
//! flattening it, so a message can be handed back to the interface unchanged. The model and
//! provider selection travel inside the message text as bracketed tags, see [`model_info`].
pub mod content;
pub mod message;
pub mod model_info;
pub mod role;
