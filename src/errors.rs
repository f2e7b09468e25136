use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::rpc::envelope::error_codes;

/// Failures the transport must treat as fatal for the current exchange.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal error")]
    Internal { code: &'static str, message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Internal { code, message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
                details: json!({}),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error("{service:?} has no exported methods of suitable type")]
    NoSuitableMethods { service: String },
    #[error("service already defined: {service:?}")]
    DuplicateService { service: String },
}

/// A request that could not be routed or completed.
///
/// Every variant becomes an error envelope; none of them is fatal to the
/// process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),
    #[error("Service not found: {0}")]
    ServiceNotFound(String),
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("{0}")]
    Application(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Request cancelled")]
    Cancelled,
}

impl RpcError {
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::ServiceNotFound(_) | Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            Self::Application(_) => error_codes::APPLICATION_ERROR,
            Self::Internal(_) => error_codes::INTERNAL_ERROR,
            Self::Cancelled => error_codes::REQUEST_CANCELLED,
        }
    }
}
