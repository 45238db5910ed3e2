//! The RPC engine: one process-wide [`McpServer`] owning the capability
//! registry, and a per-transport [`ServerConnection`] state machine that
//! routes decoded messages to the registered capabilities.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;

use crate::{
    error::ErrorData,
    model::{
        CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
        JsonRpcMessage, JsonRpcRequest, ListToolsResult, METHOD_INITIALIZE, METHOD_PING,
        METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, NOTIFICATION_INITIALIZED, PROTOCOL_VERSION_LATEST,
        RequestId, SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities,
    },
    toolset::{ToolError, ToolSet},
    transport::{Transport, TransportError},
};

/// The engine: server identity plus the read-only capability registry.
/// Constructed once and shared by reference across every transport.
pub struct McpServer {
    info: Implementation,
    instructions: Option<String>,
    tools: ToolSet,
}

impl McpServer {
    pub fn new(tools: ToolSet) -> Self {
        Self {
            info: Implementation::from_build_env(),
            instructions: None,
            tools,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Bind a new transport to this engine. Each transport gets its own
    /// connection state; the registry stays shared.
    pub fn connect(self: &Arc<Self>) -> ServerConnection {
        ServerConnection {
            server: Arc::clone(self),
            state: ConnectionState::New,
            protocol_version: None,
        }
    }

    fn negotiate_protocol(&self, requested: &str) -> String {
        if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
            requested.to_string()
        } else {
            PROTOCOL_VERSION_LATEST.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    New,
    InitResponded,
    Ready,
}

/// Per-transport connection state machine.
pub struct ServerConnection {
    server: Arc<McpServer>,
    state: ConnectionState,
    protocol_version: Option<String>,
}

impl ServerConnection {
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Handle one decoded message. Requests produce exactly one reply;
    /// notifications and stray responses produce none.
    pub async fn handle_message(&mut self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification.method);
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_) => None,
        }
    }

    async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcMessage {
        let id = request.id.clone();
        tracing::debug!(%id, method = %request.method, "handling request");
        match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(request),
            METHOD_PING => JsonRpcMessage::response(id, serde_json::json!({})),
            METHOD_TOOLS_LIST => {
                if self.state == ConnectionState::New {
                    return JsonRpcMessage::error(ErrorData::not_initialized(), Some(id));
                }
                let result = ListToolsResult {
                    tools: self.server.tools.list(),
                    next_cursor: None,
                };
                Self::response(id, &result)
            }
            METHOD_TOOLS_CALL => {
                if self.state == ConnectionState::New {
                    return JsonRpcMessage::error(ErrorData::not_initialized(), Some(id));
                }
                let Some(params) = request.params else {
                    return JsonRpcMessage::error(
                        ErrorData::invalid_params("missing params"),
                        Some(id),
                    );
                };
                let params: CallToolParams = match serde_json::from_value(params) {
                    Ok(p) => p,
                    Err(e) => {
                        return JsonRpcMessage::error(
                            ErrorData::invalid_params(e.to_string()),
                            Some(id),
                        );
                    }
                };
                self.handle_tool_call(id, params).await
            }
            other => JsonRpcMessage::error(ErrorData::method_not_found(other), Some(id)),
        }
    }

    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcMessage {
        let id = request.id;
        if self.state != ConnectionState::New {
            return JsonRpcMessage::error(
                ErrorData::invalid_request("server already initialized"),
                Some(id),
            );
        }
        let Some(params) = request.params else {
            return JsonRpcMessage::error(ErrorData::invalid_params("missing params"), Some(id));
        };
        let params: InitializeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcMessage::error(ErrorData::invalid_params(e.to_string()), Some(id));
            }
        };

        let negotiated = self.server.negotiate_protocol(&params.protocol_version);
        self.protocol_version = Some(negotiated.clone());
        self.state = ConnectionState::InitResponded;
        tracing::debug!(
            client = %params.client_info.name,
            protocol = %negotiated,
            "initialize handshake",
        );

        let result = InitializeResult {
            protocol_version: negotiated,
            capabilities: ServerCapabilities::tools_only(),
            server_info: self.server.info.clone(),
            instructions: self.server.instructions.clone(),
        };
        Self::response(id, &result)
    }

    /// Tool invocations never raise past this boundary: execution failures
    /// come back as ordinary text results so the calling client can reason
    /// about them, and the session stays alive.
    async fn handle_tool_call(&self, id: RequestId, params: CallToolParams) -> JsonRpcMessage {
        match self.server.tools.call(&params.name, params.arguments).await {
            Ok(content) => Self::response(id, &CallToolResult::success(content)),
            Err(error @ ToolError::NotFound(_)) => {
                JsonRpcMessage::error(ErrorData::invalid_params(error.to_string()), Some(id))
            }
            Err(ToolError::InvalidParameters(detail)) => {
                JsonRpcMessage::error(ErrorData::invalid_params(detail), Some(id))
            }
            Err(error) => {
                tracing::warn!(tool = %params.name, %error, "tool execution failed");
                Self::response(id, &CallToolResult::error(error.to_string()))
            }
        }
    }

    fn handle_notification(&mut self, method: &str) {
        if method == NOTIFICATION_INITIALIZED && self.state == ConnectionState::InitResponded {
            self.state = ConnectionState::Ready;
        }
    }

    fn response<T: serde::Serialize>(id: RequestId, result: &T) -> JsonRpcMessage {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcMessage::response(id, value),
            Err(e) => JsonRpcMessage::error(ErrorData::internal_error(e.to_string()), Some(id)),
        }
    }

    /// Drive this connection from a [`Transport`] until its stream ends.
    /// This is the whole of single-session pipe mode: decode errors are
    /// answered with protocol errors, everything else flows through
    /// [`handle_message`](Self::handle_message).
    pub async fn serve<T>(mut self, mut transport: T) -> Result<(), TransportError>
    where
        T: Transport + Unpin + Send,
    {
        tracing::info!("server connection started");
        while let Some(item) = transport.next().await {
            match item {
                Ok(message) => {
                    if let Some(reply) = self.handle_message(message).await {
                        transport.write_message(reply).await?;
                    }
                }
                Err(TransportError::Io(e)) => return Err(TransportError::Io(e)),
                Err(e) => {
                    let error = match e {
                        TransportError::Json(_) | TransportError::Utf8(_) => {
                            ErrorData::parse_error(e.to_string())
                        }
                        _ => ErrorData::invalid_request(e.to_string()),
                    };
                    transport
                        .write_message(JsonRpcMessage::error(error, None))
                        .await?;
                }
            }
        }
        tracing::info!("server connection closed");
        Ok(())
    }
}
