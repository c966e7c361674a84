use super::request::ChatRequest;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{self, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use duet::events::{ChannelSink, DataEvent, SinkEvent};
use duet::models::message::last_user_message;
use duet::providers::base::Usage;
use futures::Stream;
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// Custom SSE response type that implements the Vercel AI SDK protocol
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        let mut response = http::Response::new(body);
        let headers = response.headers_mut();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(
            http::header::CACHE_CONTROL,
            http::HeaderValue::from_static("no-cache"),
        );
        headers.insert(
            http::header::CONNECTION,
            http::HeaderValue::from_static("keep-alive"),
        );
        headers.insert(
            "x-vercel-ai-data-stream",
            http::HeaderValue::from_static("v1"),
        );
        response
    }
}

// Protocol-specific message formatting
struct ProtocolFormatter;

impl ProtocolFormatter {
    fn format_text(text: &str) -> String {
        let encoded_text = serde_json::to_string(text).unwrap_or_else(|_| String::new());
        format!("0:{}\n", encoded_text)
    }

    fn format_data(event: &DataEvent) -> String {
        // Data parts start with "2:" and carry an array
        format!("2:{}\n", json!([event]))
    }

    fn format_annotation(event: &DataEvent) -> String {
        // Message annotations start with "8:"
        format!("8:{}\n", json!([event]))
    }

    fn format_error(message: &str) -> String {
        let encoded = serde_json::to_string(message).unwrap_or_else(|_| String::new());
        format!("3:{}\n", encoded)
    }

    fn format_finish(reason: &str, usage: Usage) -> String {
        // Finish messages start with "d:"
        let finish = json!({
            "finishReason": reason,
            "usage": {
                "promptTokens": usage.prompt_tokens,
                "completionTokens": usage.completion_tokens
            }
        });
        format!("d:{}\n", finish)
    }

    fn format_event(event: &SinkEvent) -> String {
        match event {
            SinkEvent::Text(text) => Self::format_text(text),
            SinkEvent::Data(data) => Self::format_data(data),
            SinkEvent::Annotation(annotation) => Self::format_annotation(annotation),
        }
    }
}

async fn forward(tx: &mpsc::Sender<String>, event: &SinkEvent) {
    // A closed channel means the client went away; the run itself carries on
    if tx.send(ProtocolFormatter::format_event(event)).await.is_err() {
        tracing::debug!("Client disconnected, dropping event");
    }
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<SseResponse, StatusCode> {
    // Check protocol header (optional in our case)
    if let Some(protocol) = headers.get("x-protocol") {
        if protocol.to_str().map(|p| p != "data").unwrap_or(true) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    if last_user_message(&request.messages).is_none() {
        tracing::warn!("Rejecting chat request without a user message");
        return Err(StatusCode::BAD_REQUEST);
    }

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (messages, ctx) =
        request.into_parts(Arc::new(ChannelSink::new(event_tx)), state.context_optimization);
    let orchestrator = state.orchestrator;

    tokio::spawn(async move {
        let run = orchestrator.run(&messages, &ctx);
        tokio::pin!(run);

        let outcome = loop {
            tokio::select! {
                Some(event) = event_rx.recv() => forward(&tx, &event).await,
                outcome = &mut run => break outcome,
            }
        };
        // Sink writes are synchronous, so everything the run produced is already queued
        while let Ok(event) = event_rx.try_recv() {
            forward(&tx, &event).await;
        }

        let finish = match outcome {
            Ok(result) => ProtocolFormatter::format_finish("stop", result.usage),
            Err(e) => {
                tracing::error!("Error processing chat request: {}", e);
                let _ = tx.send(ProtocolFormatter::format_error(&e.to_string())).await;
                ProtocolFormatter::format_finish("error", Usage::default())
            }
        };
        let _ = tx.send(finish).await;
    });

    Ok(SseResponse::new(stream))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handler))
        .with_state(state)
}
