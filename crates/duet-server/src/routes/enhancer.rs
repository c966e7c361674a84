use super::request::ChatRequest;
use crate::error::status_for;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use duet::agents::coerce_to_text;
use duet::events::NullSink;
use std::sync::Arc;

// Runs only the enhancement stage and answers with the enhanced prompt, non streaming
async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<String, (StatusCode, String)> {
    let (messages, ctx) = request.into_parts(Arc::new(NullSink), state.context_optimization);

    match state.orchestrator.enhancer().execute(&messages, &ctx).await {
        Ok(output) => Ok(coerce_to_text(output.output).await),
        Err(e) => {
            tracing::error!("Error enhancing prompt: {}", e);
            Err((status_for(&e), e.to_string()))
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/enhancer", post(handler))
        .with_state(state)
}
