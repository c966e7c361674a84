pub mod chat;
pub mod enhancer;
pub mod request;
pub mod status;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(enhancer::routes(state))
        .merge(status::routes())
}
