use axum::http::StatusCode;
use duet::errors::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted configuration field
pub fn to_env_var(field_path: &str) -> String {
    format!("DUET_{}", field_path.replace('.', "__").to_uppercase())
}

/// HTTP status for a pipeline failure that happens before anything was streamed
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::MissingUserMessage => StatusCode::BAD_REQUEST,
        PipelineError::MissingApiKey { .. } => StatusCode::UNAUTHORIZED,
        PipelineError::Invocation(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
