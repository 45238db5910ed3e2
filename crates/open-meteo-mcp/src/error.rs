use std::{borrow::Cow, fmt::Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const PARSE_ERROR: Self = Self(-32700);
    pub const INVALID_REQUEST: Self = Self(-32600);
    pub const METHOD_NOT_FOUND: Self = Self(-32601);
    pub const INVALID_PARAMS: Self = Self(-32602);
    pub const INTERNAL_ERROR: Self = Self(-32603);
    /// Used by the streamable HTTP transport for requests that carry no
    /// usable session identifier.
    pub const BAD_REQUEST: Self = Self(-32000);
    pub const NOT_INITIALIZED: Self = Self(-32002);
}

/// The error payload carried by a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: ErrorCode,
    pub message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::INTERNAL_ERROR, message)
    }

    pub fn not_initialized() -> Self {
        Self::new(ErrorCode::NOT_INITIALIZED, "Server not initialized")
    }

    /// The envelope payload the HTTP transport returns for requests without
    /// a valid session identifier.
    pub fn bad_session() -> Self {
        Self::new(
            ErrorCode::BAD_REQUEST,
            "Bad Request: No valid session ID provided",
        )
    }
}

impl Display for ErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.0, self.message)?;
        if let Some(data) = &self.data {
            write!(f, "({})", data)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorData {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_data() {
        let error = ErrorData::new(ErrorCode::INVALID_REQUEST, "Invalid Request");
        assert_eq!(format!("{}", error), "-32600: Invalid Request");
    }

    #[test]
    fn display_with_data() {
        let error = ErrorData::new(ErrorCode::INVALID_REQUEST, "Invalid Request")
            .with_data(serde_json::json!({"detail": "missing field"}));
        assert_eq!(
            format!("{}", error),
            "-32600: Invalid Request({\"detail\":\"missing field\"})"
        );
    }

    #[test]
    fn bad_session_matches_wire_contract() {
        let error = ErrorData::bad_session();
        let value = serde_json::to_value(&error).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "code": -32000,
                "message": "Bad Request: No valid session ID provided",
            })
        );
    }
}
