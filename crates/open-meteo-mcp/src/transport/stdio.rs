//! Single-session pipe transport: newline-delimited JSON-RPC frames over a
//! pair of byte streams, usually the process's stdin and stdout.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;
use bytes::BytesMut;
use futures::Stream;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, Stdin, Stdout};
use tokio_util::codec::{Decoder, FramedRead};

use super::{Transport, TransportError};
use crate::model::JsonRpcMessage;

/// Splits the inbound byte stream on `\n` and parses each non-empty line as
/// one JSON-RPC message.
#[derive(Debug, Default)]
pub struct JsonRpcFrameCodec;

impl Decoder for JsonRpcFrameCodec {
    type Item = JsonRpcMessage;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(end) = src.iter().position(|b| *b == b'\n') {
            let frame = src.split_to(end + 1);
            let line = std::str::from_utf8(&frame[..end])?.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(line)?));
        }
        Ok(None)
    }
}

pub struct StdioTransport<R, W> {
    reader: FramedRead<R, JsonRpcFrameCodec>,
    writer: W,
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedRead::new(reader, JsonRpcFrameCodec),
            writer,
        }
    }
}

/// The transport bound to this process's standard streams.
pub fn stdio() -> StdioTransport<Stdin, Stdout> {
    StdioTransport::new(tokio::io::stdin(), tokio::io::stdout())
}

impl<R, W> Stream for StdioTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: Unpin,
{
    type Item = Result<JsonRpcMessage, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.reader).poll_next(cx)
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn write_message(&mut self, message: JsonRpcMessage) -> Result<(), TransportError> {
        let json = serde_json::to_string(&message)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::model::{JsonRpcRequest, RequestId};

    #[tokio::test]
    async fn decodes_line_frames_and_skips_blanks() {
        let (client, server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut transport = StdioTransport::new(read_half, write_half);

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write
            .write_all(b"\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .expect("write");

        let message = transport.next().await.expect("frame").expect("decode");
        assert!(
            matches!(message, JsonRpcMessage::Request(ref r) if r.method == "ping" && r.id == RequestId::Number(1))
        );

        transport
            .write_message(JsonRpcMessage::Request(JsonRpcRequest::new(
                RequestId::Number(2),
                "ping",
                None,
            )))
            .await
            .expect("write message");
        let mut buf = vec![0u8; 256];
        let n = tokio::io::AsyncReadExt::read(&mut client_read, &mut buf)
            .await
            .expect("read");
        let line = std::str::from_utf8(&buf[..n]).expect("utf8");
        assert!(line.ends_with('\n'));
        assert!(line.contains("\"id\":2"));
    }

    #[tokio::test]
    async fn malformed_frame_surfaces_json_error() {
        let (client, server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut transport = StdioTransport::new(read_half, write_half);

        let (_client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(b"not json\n").await.expect("write");

        let item = transport.next().await.expect("frame");
        assert!(matches!(item, Err(TransportError::Json(_))));
    }

    #[tokio::test]
    async fn stream_ends_on_eof() {
        let (client, server) = tokio::io::duplex(64);
        let (read_half, write_half) = tokio::io::split(server);
        let mut transport = StdioTransport::new(read_half, write_half);
        drop(client);
        assert!(transport.next().await.is_none());
    }
}
