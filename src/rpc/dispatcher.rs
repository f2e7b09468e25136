//! The request dispatcher
//!
//! Turns one raw request body into exactly one response envelope: decoding,
//! `Service.Method` routing through the [`ServiceRegistry`], argument decoding,
//! invocation, and error mapping all happen here.

use std::{sync::Arc, time::Instant};

use serde_json::Value;
use tracing::info;

use crate::errors::{AppError, RegistryError, RpcError};
use crate::rpc::{
    context::CallContext,
    envelope::{is_valid_id, Request, Response, JSONRPC_VERSION},
    registry::{DuplicatePolicy, RpcService, ServiceRegistry, ServiceSummary},
};

#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: ServiceRegistry,
}

/// A request rejected before it could be routed, with the id to echo.
struct Rejected {
    id: Value,
    error: RpcError,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            registry: ServiceRegistry::with_policy(policy),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn register<R: RpcService>(
        &self,
        name: &str,
        receiver: Arc<R>,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, receiver)
    }

    pub fn services(&self) -> Vec<ServiceSummary> {
        self.registry.services()
    }

    pub fn handle(&self, body: &[u8]) -> Result<Vec<u8>, AppError> {
        self.handle_with(body, &CallContext::new())
    }

    /// Dispatches `body` and encodes the resulting envelope.
    ///
    /// Routing and handler failures are encoded as error envelopes; only a
    /// failure to encode the envelope itself is returned as `Err`.
    pub fn handle_with(&self, body: &[u8], context: &CallContext) -> Result<Vec<u8>, AppError> {
        let response = self.dispatch(body, context);
        serde_json::to_vec(&response)
            .map_err(|err| AppError::internal(format!("failed to encode rpc response: {err}")))
    }

    pub fn dispatch(&self, body: &[u8], context: &CallContext) -> Response {
        let started_at = Instant::now();

        let request = match parse_request(body) {
            Ok(request) => request,
            Err(Rejected { id, error }) => {
                info!(
                    outcome = "failure",
                    code = error.code(),
                    error = %error,
                    "rpc request rejected"
                );
                return Response::failure(id, &error);
            }
        };

        let outcome = self.call(&request, context);
        let elapsed_ms = started_at.elapsed().as_millis();

        match outcome {
            Ok(result) => {
                info!(
                    method = %request.method,
                    outcome = "success",
                    duration_ms = elapsed_ms,
                    "rpc call audited"
                );
                Response::success(request.id, result)
            }
            Err(error) => {
                info!(
                    method = %request.method,
                    outcome = "failure",
                    code = error.code(),
                    error = %error,
                    duration_ms = elapsed_ms,
                    "rpc call audited"
                );
                Response::failure(request.id, &error)
            }
        }
    }

    fn call(&self, request: &Request, context: &CallContext) -> Result<Value, RpcError> {
        let (service, method) = request.route().ok_or_else(|| {
            RpcError::InvalidRequest("method name format Service.Method".to_string())
        })?;

        let descriptor = self.registry.lookup(service, method)?;
        descriptor.invoke(request.first_param(), context)
    }
}

/// Decodes the envelope; anything short of a well-formed request object is a
/// parse error with a null id.
fn parse_request(body: &[u8]) -> Result<Request, Rejected> {
    let unparsable = |message: String| Rejected {
        id: Value::Null,
        error: RpcError::Parse(message),
    };

    let payload: Value = serde_json::from_slice(body).map_err(|err| unparsable(err.to_string()))?;

    if payload.is_array() {
        return Err(unparsable("batch requests are not supported".to_string()));
    }

    let request: Request =
        serde_json::from_value(payload).map_err(|err| unparsable(err.to_string()))?;

    if !is_valid_id(&request.id) {
        return Err(unparsable("id must be a string, number, or null".to_string()));
    }

    if let Some(version) = request.jsonrpc.as_deref() {
        if version != JSONRPC_VERSION {
            return Err(Rejected {
                error: RpcError::InvalidRequest(format!("unsupported jsonrpc version {version:?}")),
                id: request.id,
            });
        }
    }

    Ok(request)
}
