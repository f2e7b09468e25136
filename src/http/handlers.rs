//! Axum HTTP handlers for the web server
//!
//! Provides the JSON-RPC endpoint that feeds request bodies to the dispatcher,
//! and the health and discovery metadata endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

use crate::errors::AppError;
use crate::rpc::{registry::ServiceSummary, CallContext};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub rpc_endpoint: String,
    pub generated_at_utc: String,
    pub services: Vec<ServiceSummary>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        rpc_endpoint: state.rpc_path.to_string(),
        generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        services: state.dispatcher.services(),
    })
}

/// Runs one JSON-RPC exchange.
///
/// Every envelope, including RPC errors, is sent with `200 OK`. The call is
/// cancelled if this future is dropped or the configured timeout elapses
/// before the receiver is invoked.
pub async fn rpc_endpoint(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let context = CallContext::new();
    let _cancel_on_drop = context.cancel_on_drop();

    let dispatcher = Arc::clone(&state.dispatcher);
    let task_context = context.clone();
    let mut task =
        tokio::task::spawn_blocking(move || dispatcher.handle_with(&body, &task_context));

    let joined = match state.request_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(timeout_ms = limit.as_millis(), "rpc request timed out");
                context.cancel();
                task.await
            }
        },
        None => task.await,
    };

    let encoded = joined
        .map_err(|err| AppError::internal(format!("rpc task failed: {err}")))??;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        encoded,
    )
        .into_response())
}
