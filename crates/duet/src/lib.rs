pub mod agents;
pub mod context_selection;
pub mod errors;
pub mod events;
pub mod files;
pub mod key_manager;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod prompt_template;
pub mod providers;
pub mod resolver;
