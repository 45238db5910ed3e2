//! Streamable HTTP server transport.
//!
//! Multiplexes many concurrently live protocol sessions over one stateless
//! HTTP endpoint: `POST /mcp` creates or reuses a session, `GET /mcp` opens
//! the server-to-client notification stream, `DELETE /mcp` terminates the
//! session. The session table lives in [`session::SessionManager`]; the
//! axum routes live in [`axum::StreamableHttpService`].

pub mod axum;
pub mod session;

use std::time::Duration;

/// Configuration for the streamable HTTP server, read once at startup.
#[derive(Debug, Clone)]
pub struct StreamableHttpServerConfig {
    /// Route the MCP endpoints are mounted on.
    pub path: String,
    /// The ping message duration for SSE connections.
    pub sse_keep_alive: Option<Duration>,
    /// Allowed CORS origins; empty list means any origin.
    pub allowed_origins: Vec<String>,
    /// Host-header allowlist for DNS-rebinding protection. `None` disables
    /// the check; the default allows only loopback names.
    pub allowed_hosts: Option<Vec<String>>,
}

impl Default for StreamableHttpServerConfig {
    fn default() -> Self {
        Self {
            path: "/mcp".to_string(),
            sse_keep_alive: Some(Duration::from_secs(15)),
            allowed_origins: Vec::new(),
            allowed_hosts: Some(vec!["127.0.0.1".to_string(), "localhost".to_string()]),
        }
    }
}

pub use axum::StreamableHttpService;
pub use session::{HEADER_SESSION_ID, SessionId, SessionManager};
