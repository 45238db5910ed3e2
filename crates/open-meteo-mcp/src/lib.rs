//! Open-Meteo weather tools served over the Model Context Protocol.
//!
//! The server runs in one of two modes: a single-session pipe bound to the
//! process's standard streams, or a multi-session streamable HTTP endpoint
//! where each session is created by the `initialize` handshake, addressed
//! through the `mcp-session-id` header, and torn down by an explicit
//! DELETE or by its transport closing.

pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod tools;
pub mod toolset;
pub mod transport;
pub mod weather;

pub use error::{ErrorCode, ErrorData};
pub use service::{McpServer, ServerConnection};
pub use toolset::{ToolError, ToolSet};
pub use weather::WeatherClient;
