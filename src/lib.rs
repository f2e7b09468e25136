use std::{sync::Arc, time::Duration};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod rpc;
pub mod services;

use rpc::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub rpc_path: Arc<str>,
    pub request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        rpc_path: String,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            dispatcher,
            rpc_path: Arc::<str>::from(rpc_path),
            request_timeout,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/jsonrpc", get(http::handlers::discovery))
        .route(&state.rpc_path, post(http::handlers::rpc_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
