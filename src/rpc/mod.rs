//! Dynamic JSON-RPC dispatch
//!
//! Provides the service registry, the wire envelopes, and the dispatcher that
//! routes `Service.Method` requests to registered receivers.

pub mod context;
pub mod dispatcher;
pub mod envelope;
pub mod registry;

pub use context::CallContext;
pub use dispatcher::Dispatcher;
pub use registry::{DuplicatePolicy, MethodTable, RpcService, ServiceRegistry};
