//! Method call and response types of the command surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation id of a call (can be string or number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// A named command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: None,
            method: method.into(),
            arguments: Value::Null,
        }
    }

    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_arguments(mut self, arguments: impl Serialize) -> Self {
        self.arguments = serde_json::to_value(arguments).unwrap_or(Value::Null);
        self
    }

    /// Get a string argument, treating `null` as absent.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }
}

/// Machine-readable error codes returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    SendFailed,
    OperationFailed,
    ReadFailed,
    NotImplemented,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::SendFailed => "SEND_FAILED",
            ErrorCode::OperationFailed => "OPERATION_FAILED",
            ErrorCode::ReadFailed => "READ_FAILED",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

/// A structured command failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl std::fmt::Display for MethodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code.as_str();
        let message = &self.message;
        write!(f, "[{code}] {message}")
    }
}

impl std::error::Error for MethodError {}

/// Outcome of a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success {
        #[serde(default)]
        result: Value,
    },
    Error(MethodError),
    NotImplemented {
        method: String,
    },
}

impl MethodResponse {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(MethodError {
            code,
            message: message.into(),
            details: None,
        })
    }

    pub fn not_implemented(method: impl Into<String>) -> Self {
        Self::NotImplemented {
            method: method.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The error code, if this response is a failure.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success { .. } => None,
            Self::Error(error) => Some(error.code),
            Self::NotImplemented { .. } => Some(ErrorCode::NotImplemented),
        }
    }

    /// Returns the result if successful, or the error.
    pub fn into_result(self) -> Result<Value, MethodError> {
        match self {
            Self::Success { result } => Ok(result),
            Self::Error(error) => Err(error),
            Self::NotImplemented { method } => Err(MethodError {
                code: ErrorCode::NotImplemented,
                message: format!("method not implemented: {method}"),
                details: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_call_without_arguments() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"startListening"}"#).unwrap();
        assert_eq!(call.method, "startListening");
        assert!(call.id.is_none());
        assert!(call.arguments.is_null());
    }

    #[test]
    fn str_arg_reads_strings_only() {
        let call = MethodCall::new("sendMessage")
            .with_id(7_i64)
            .with_arguments(json!({"destination": "010", "body": null, "limit": 3}));
        assert_eq!(call.id, Some(RequestId::Number(7)));
        assert_eq!(call.str_arg("destination"), Some("010"));
        assert_eq!(call.str_arg("body"), None);
        assert_eq!(call.str_arg("limit"), None);
    }

    #[test]
    fn serialize_error_response() {
        let response = MethodResponse::error(ErrorCode::SendFailed, "radio off");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            json!({"status": "error", "code": "SEND_FAILED", "message": "radio off"})
        );
    }

    #[test]
    fn not_implemented_is_an_error_result() {
        let response = MethodResponse::not_implemented("launchRockets");
        assert_eq!(response.error_code(), Some(ErrorCode::NotImplemented));
        let error = response.into_result().unwrap_err();
        assert_eq!(error.to_string(), "[NOT_IMPLEMENTED] method not implemented: launchRockets");
    }
}
