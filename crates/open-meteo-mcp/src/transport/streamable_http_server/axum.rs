//! Axum routes for the streamable HTTP transport.
//!
//! `POST /mcp` creates or reuses a session per the lifecycle rules in
//! [`super::session`], `GET /mcp` attaches the SSE notification stream,
//! `DELETE /mcp` terminates a session, and `GET /health` always succeeds.

use std::{io, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::{
    StreamableHttpServerConfig,
    session::{HEADER_SESSION_ID, SessionError, SessionHandle, SessionManager},
};
use crate::{error::ErrorData, model::JsonRpcMessage};

/// The streamable HTTP service: an injected session manager plus the
/// startup configuration, turned into an axum [`Router`].
#[derive(Clone)]
pub struct StreamableHttpService {
    sessions: Arc<SessionManager>,
    config: StreamableHttpServerConfig,
}

impl StreamableHttpService {
    pub fn new(sessions: Arc<SessionManager>, config: StreamableHttpServerConfig) -> Self {
        Self { sessions, config }
    }

    /// Build the router. Fails only on unparseable configured origins,
    /// which is a fatal startup error.
    pub fn router(&self) -> Result<Router, header::InvalidHeaderValue> {
        let cors = cors_layer(&self.config.allowed_origins)?;
        let router = Router::new()
            .route(
                &self.config.path,
                post(post_handler).get(get_handler).delete(delete_handler),
            )
            .layer(middleware::from_fn_with_state(
                self.clone(),
                enforce_allowed_hosts,
            ))
            .route("/health", get(health_handler))
            .layer(cors)
            .with_state(self.clone());
        Ok(router)
    }

    /// Bind and serve until `ct` is cancelled, then shut down gracefully
    /// and close every live session.
    pub async fn serve(self, addr: SocketAddr, ct: CancellationToken) -> io::Result<()> {
        let router = self.router().map_err(io::Error::other)?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "MCP server listening");
        let sessions = Arc::clone(&self.sessions);
        let shutdown = ct.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("shutting down");
                sessions.shutdown();
            })
            .await
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, header::InvalidHeaderValue> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let values = origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(HEADER_SESSION_ID),
        ])
        .expose_headers([HeaderName::from_static(HEADER_SESSION_ID)]))
}

/// DNS-rebinding protection: requests whose Host header is not on the
/// allowlist never reach the session layer.
async fn enforce_allowed_hosts(
    State(service): State<StreamableHttpService>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(allowed) = &service.config.allowed_hosts {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(|host| host.split(':').next().unwrap_or(host));
        let permitted = host
            .map(|host| allowed.iter().any(|name| name.eq_ignore_ascii_case(host)))
            .unwrap_or(false);
        if !permitted {
            tracing::warn!(host = host.unwrap_or("<missing>"), "rejected by host allowlist");
            return (StatusCode::FORBIDDEN, "Forbidden: host not allowed").into_response();
        }
    }
    next.run(request).await
}

fn session_id_header(id: &str) -> [(HeaderName, HeaderValue); 1] {
    [(
        HeaderName::from_static(HEADER_SESSION_ID),
        HeaderValue::try_from(id).unwrap_or_else(|_| HeaderValue::from_static("")),
    )]
}

/// The exact envelope for POSTs without a usable session: wrong or unknown
/// id, or no id together with a body that is not the handshake.
fn bad_session_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(JsonRpcMessage::error(ErrorData::bad_session(), None)),
    )
        .into_response()
}

fn invalid_session_response() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid or missing session ID").into_response()
}

fn header_session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(HEADER_SESSION_ID)?.to_str().ok()
}

async fn find_session(
    service: &StreamableHttpService,
    headers: &HeaderMap,
) -> Option<Arc<SessionHandle>> {
    let id = header_session_id(headers)?;
    service.sessions.find(id).await
}

async fn post_handler(
    State(service): State<StreamableHttpService>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = header_session_id(&headers);
    let message = serde_json::from_slice::<JsonRpcMessage>(&body).ok();
    match (session_id, message) {
        // Case A: known session, forward to its transport.
        (Some(id), Some(message)) => {
            let Some(handle) = service.sessions.find(id).await else {
                return bad_session_response();
            };
            match handle.handle_message(message).await {
                Ok(Some(reply)) => {
                    (StatusCode::OK, session_id_header(handle.id()), Json(reply)).into_response()
                }
                Ok(None) => {
                    (StatusCode::ACCEPTED, session_id_header(handle.id())).into_response()
                }
                // The worker died underneath us; indistinguishable from an
                // unknown session for the caller.
                Err(_) => bad_session_response(),
            }
        }
        // Case B: no session yet, and the body is the handshake.
        (None, Some(message)) if message.is_initialize_request() => {
            match service.sessions.create_session(message).await {
                Ok((handle, reply)) => {
                    (StatusCode::OK, session_id_header(handle.id()), Json(reply)).into_response()
                }
                Err(SessionError::InitializeFailed(error)) => {
                    (StatusCode::BAD_REQUEST, Json(JsonRpcMessage::error(error, None)))
                        .into_response()
                }
                Err(error) => {
                    tracing::error!(%error, "session creation failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "failed to create session").into_response()
                }
            }
        }
        // Case C: everything else is rejected before any transport work.
        _ => bad_session_response(),
    }
}

async fn get_handler(State(service): State<StreamableHttpService>, headers: HeaderMap) -> Response {
    let Some(handle) = find_session(&service, &headers).await else {
        return invalid_session_response();
    };
    match handle.take_notification_stream().await {
        Ok(stream) => {
            let stream =
                stream.map(|message| Event::default().event("message").json_data(&message));
            let sse = Sse::new(stream);
            let sse = match service.config.sse_keep_alive {
                Some(interval) => {
                    sse.keep_alive(KeepAlive::new().interval(interval)).into_response()
                }
                None => sse.into_response(),
            };
            (session_id_header(handle.id()), sse).into_response()
        }
        Err(_) => {
            (StatusCode::CONFLICT, "notification stream already established").into_response()
        }
    }
}

async fn delete_handler(
    State(service): State<StreamableHttpService>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = header_session_id(&headers) else {
        return invalid_session_response();
    };
    match service.sessions.close_session(id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(_) => invalid_session_response(),
    }
}

async fn health_handler() -> &'static str {
    "OK"
}
