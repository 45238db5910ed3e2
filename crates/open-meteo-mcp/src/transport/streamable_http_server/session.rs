//! Session management for the streamable HTTP transport.
//!
//! A *session* groups the logically related exchanges between one MCP
//! client and the server, starting from the `initialize` handshake. The
//! server assigns each session a unique [`SessionId`] (returned via the
//! `mcp-session-id` response header) and the client includes that id on
//! every subsequent request.
//!
//! The [`SessionManager`] owns the concurrent id → session table and the
//! lifecycle rules: sessions are created only on a handshake, inserted only
//! once their transport has produced a successful initialize response, and
//! removed only in reaction to the session's closure event.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::{
    error::ErrorData,
    model::JsonRpcMessage,
    service::{McpServer, ServerConnection},
};

/// Header carrying the session identifier, lowercase per HTTP/2 convention.
pub const HEADER_SESSION_ID: &str = "mcp-session-id";

pub type SessionId = Arc<str>;

/// Server-generated, cryptographically random session identifier. Clients
/// never supply one at creation time.
pub fn session_id() -> SessionId {
    uuid::Uuid::new_v4().to_string().into()
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session worker closed")]
    WorkerClosed,
    #[error("initialize failed: {0}")]
    InitializeFailed(ErrorData),
    #[error("handshake produced no response")]
    NoHandshakeResponse,
    #[error("notification stream already attached")]
    StreamTaken,
}

enum SessionCommand {
    Message {
        message: JsonRpcMessage,
        respond: oneshot::Sender<Option<JsonRpcMessage>>,
    },
}

/// Table value for one live session: the channel into its worker task, the
/// closure token, and the (single-consumer) notification stream slot.
pub struct SessionHandle {
    id: SessionId,
    to_worker: mpsc::Sender<SessionCommand>,
    closed: CancellationToken,
    notifications: Mutex<Option<mpsc::Receiver<JsonRpcMessage>>>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Forward one decoded message to the session's transport worker and
    /// wait for its reply (`None` for notifications).
    pub async fn handle_message(
        &self,
        message: JsonRpcMessage,
    ) -> Result<Option<JsonRpcMessage>, SessionError> {
        let (respond, reply) = oneshot::channel();
        self.to_worker
            .send(SessionCommand::Message { message, respond })
            .await
            .map_err(|_| SessionError::WorkerClosed)?;
        reply.await.map_err(|_| SessionError::WorkerClosed)
    }

    /// Detach the server-to-client notification stream. At most one stream
    /// per session; it ends when the session closes.
    pub async fn take_notification_stream(
        &self,
    ) -> Result<ReceiverStream<JsonRpcMessage>, SessionError> {
        let receiver = self.notifications.lock().await.take();
        receiver
            .map(ReceiverStream::new)
            .ok_or(SessionError::StreamTaken)
    }

    /// Fire the closure event. Safe to call repeatedly; only the first call
    /// has any effect.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Per-session transport worker: owns the connection to the RPC engine and
/// processes commands strictly in arrival order. Whatever ends the loop,
/// the closure token is cancelled exactly once on the way out.
async fn run_session(
    id: SessionId,
    mut connection: ServerConnection,
    mut commands: mpsc::Receiver<SessionCommand>,
    closed: CancellationToken,
    notifications: mpsc::Sender<JsonRpcMessage>,
) {
    loop {
        tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            command = commands.recv() => match command {
                Some(SessionCommand::Message { message, respond }) => {
                    let reply = connection.handle_message(message).await;
                    let _ = respond.send(reply);
                }
                None => break,
            },
        }
    }
    // Dropping the sender ends any standalone notification stream.
    drop(notifications);
    closed.cancel();
    tracing::debug!(session = %id, "session worker stopped");
}

/// The session lifecycle controller: an explicitly-owned concurrent map
/// from [`SessionId`] to live [`SessionHandle`], injected into the HTTP
/// service at construction.
pub struct SessionManager {
    server: Arc<McpServer>,
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionHandle>>>>,
    ct: CancellationToken,
}

impl SessionManager {
    const COMMAND_CHANNEL_SIZE: usize = 16;
    const NOTIFICATION_CHANNEL_SIZE: usize = 16;

    /// `ct` is the process-level shutdown token; cancelling it closes every
    /// session created by this manager.
    pub fn new(server: Arc<McpServer>, ct: CancellationToken) -> Self {
        Self {
            server,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ct,
        }
    }

    /// Create a session for a handshake-initiating message.
    ///
    /// The transport worker is spawned and the handshake driven through it
    /// first; the table learns the id only after the worker reports a
    /// successful initialize response, so a transport that fails to
    /// initialize never leaks a table entry. The insertion completes before
    /// this function returns, so a request racing in right after the
    /// creating response is guaranteed to find the session.
    pub async fn create_session(
        &self,
        handshake: JsonRpcMessage,
    ) -> Result<(Arc<SessionHandle>, JsonRpcMessage), SessionError> {
        let id = session_id();
        let (to_worker, commands) = mpsc::channel(Self::COMMAND_CHANNEL_SIZE);
        let (notify_tx, notify_rx) = mpsc::channel(Self::NOTIFICATION_CHANNEL_SIZE);
        let closed = self.ct.child_token();

        let connection = self.server.connect();
        tokio::spawn(run_session(
            id.clone(),
            connection,
            commands,
            closed.clone(),
            notify_tx,
        ));

        let handle = Arc::new(SessionHandle {
            id: id.clone(),
            to_worker,
            closed: closed.clone(),
            notifications: Mutex::new(Some(notify_rx)),
        });

        let response = match handle.handle_message(handshake).await {
            Ok(Some(message @ JsonRpcMessage::Response(_))) => message,
            Ok(Some(JsonRpcMessage::Error(error))) => {
                closed.cancel();
                return Err(SessionError::InitializeFailed(error.error));
            }
            Ok(_) => {
                closed.cancel();
                return Err(SessionError::NoHandshakeResponse);
            }
            Err(e) => {
                closed.cancel();
                return Err(e);
            }
        };

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::clone(&handle));

        // The reaper observes the closure event and is the removal path for
        // transport-initiated teardown; after an explicit DELETE its removal
        // is a no-op.
        let sessions = Arc::clone(&self.sessions);
        let reaper_id = id.clone();
        let reaper_closed = closed.clone();
        tokio::spawn(async move {
            reaper_closed.cancelled().await;
            sessions.write().await.remove(&reaper_id);
            tracing::info!(session = %reaper_id, "session closed");
        });

        tracing::info!(session = %id, "session created");
        Ok((handle, response))
    }

    pub async fn find(&self, id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn has_session(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Explicit termination (HTTP DELETE). The entry is removed and the
    /// closure event fired in one step, so a request arriving right after
    /// the DELETE response observes the removal. Unknown ids report
    /// [`SessionError::NotFound`]; removal is idempotent, there is no
    /// resurrection.
    pub async fn close_session(&self, id: &str) -> Result<(), SessionError> {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(handle) => {
                handle.close();
                Ok(())
            }
            None => Err(SessionError::NotFound(id.into())),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every live session, e.g. on process shutdown.
    pub fn shutdown(&self) {
        self.ct.cancel();
    }
}
