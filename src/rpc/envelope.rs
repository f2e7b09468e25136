//! JSON-RPC 2.0 request and response envelopes
//!
//! Provides the wire shapes exchanged with the transport, and the mapping of
//! dispatcher failures onto error envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Error codes carried in `error.code`.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The service or the method does not exist.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// The first parameter could not be decoded into the argument type.
    pub const INVALID_PARAMS: i32 = -32602;
    /// The reply could not be encoded.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// The method ran and returned an error.
    pub const APPLICATION_ERROR: i32 = -32000;
    /// The caller abandoned the request before the method was invoked.
    pub const REQUEST_CANCELLED: i32 = -32800;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
    #[serde(default)]
    pub id: Value,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            method: method.into(),
            params: Some(params),
            id,
        }
    }

    /// The only positional argument the dispatcher looks at.
    pub fn first_param(&self) -> Option<&Value> {
        self.params.as_deref().and_then(<[Value]>::first)
    }

    /// Splits `method` on its last `.` into service and method names.
    pub fn route(&self) -> Option<(&str, &str)> {
        self.method.rsplit_once('.')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub id: Value,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: Outcome::Result(result),
            id,
        }
    }

    pub fn failure(id: Value, error: &RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: Outcome::Error(ErrorObject {
                code: error.code(),
                message: error.to_string(),
            }),
            id,
        }
    }

    pub fn error(&self) -> Option<&ErrorObject> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(result) => Some(result),
            Outcome::Error(_) => None,
        }
    }
}

/// Ids must be a string, a number, or null.
pub fn is_valid_id(id: &Value) -> bool {
    matches!(id, Value::Null | Value::String(_) | Value::Number(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_in_wire_order() {
        let response = Response::success(json!(1), json!("Hello World"));
        let encoded = serde_json::to_string(&response).expect("encode response");
        assert_eq!(encoded, r#"{"jsonrpc":"2.0","result":"Hello World","id":1}"#);
    }

    #[test]
    fn null_result_is_still_present() {
        let response = Response::success(json!("a"), Value::Null);
        let encoded = serde_json::to_value(&response).expect("encode response");
        assert_eq!(encoded, json!({"jsonrpc": "2.0", "result": null, "id": "a"}));
    }

    #[test]
    fn failure_carries_code_and_message() {
        let response = Response::failure(
            json!(2),
            &RpcError::MethodNotFound("Unknown".to_string()),
        );
        let encoded = serde_json::to_value(&response).expect("encode response");
        assert_eq!(
            encoded,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found: Unknown"},
                "id": 2
            })
        );
    }

    #[test]
    fn decodes_error_envelope() {
        let response: Response = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"boom"},"id":null}"#,
        )
        .expect("decode response");
        assert_eq!(response.error().map(|error| error.code), Some(-32000));
        assert_eq!(response.id, Value::Null);
        assert!(response.result().is_none());
    }

    #[test]
    fn request_without_version_or_id_decodes() {
        let request: Request =
            serde_json::from_str(r#"{"method":"HelloService.Hello","params":["test"]}"#)
                .expect("decode request");
        assert_eq!(request.jsonrpc, None);
        assert_eq!(request.id, Value::Null);
        assert_eq!(request.first_param(), Some(&json!("test")));
    }

    #[test]
    fn route_splits_on_last_dot() {
        let request = Request::new("pkg.Greeter.Hello", vec![], json!(1));
        assert_eq!(request.route(), Some(("pkg.Greeter", "Hello")));

        let request = Request::new("Hello", vec![], json!(1));
        assert_eq!(request.route(), None);
    }

    #[test]
    fn only_scalar_ids_are_valid() {
        assert!(is_valid_id(&json!(7)));
        assert!(is_valid_id(&json!("abc")));
        assert!(is_valid_id(&Value::Null));
        assert!(!is_valid_id(&json!({"nested": true})));
        assert!(!is_valid_id(&json!(true)));
    }
}
