//! Transport layer: framing and delivery of protocol messages for one
//! bound stream, either the process's standard streams (single-session
//! pipe mode) or the streamable HTTP session machinery.

use async_trait::async_trait;
use futures::Stream;

use crate::model::JsonRpcMessage;

pub mod stdio;
pub mod streamable_http_server;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// A bidirectional message stream: decoded inbound messages arrive through
/// the [`Stream`] impl, outbound messages go through [`write_message`].
///
/// [`write_message`]: Transport::write_message
#[async_trait]
pub trait Transport: Stream<Item = Result<JsonRpcMessage, TransportError>> {
    async fn write_message(&mut self, message: JsonRpcMessage) -> Result<(), TransportError>;
}
