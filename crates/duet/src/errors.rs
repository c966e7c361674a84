use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No user message found")]
    MissingUserMessage,

    #[error("Missing API key for {provider} provider")]
    MissingApiKey { provider: String },

    #[error("Failed to prepare context: {0}")]
    Context(String),

    #[error("Failed to render prompt: {0}")]
    Template(String),

    #[error(transparent)]
    Invocation(#[from] anyhow::Error),
}

impl From<tera::Error> for PipelineError {
    fn from(err: tera::Error) -> Self {
        PipelineError::Template(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
