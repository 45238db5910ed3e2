use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use open_meteo_mcp::{
    McpServer, WeatherClient,
    config::{ServerArgs, Settings, TransportMode},
    tools,
    transport::{
        stdio,
        streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService, session::SessionManager},
    },
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr: in pipe mode stdout belongs to the protocol.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::from_args(ServerArgs::parse());
    tracing::info!(mode = ?settings.mode, "starting MCP server");

    let client = Arc::new(WeatherClient::new());
    let server = Arc::new(McpServer::new(tools::weather_toolset(client)?));

    match settings.mode {
        TransportMode::Stdio => {
            let connection = server.connect();
            connection.serve(stdio::stdio()).await?;
        }
        TransportMode::Http => {
            let ct = CancellationToken::new();
            let sessions = Arc::new(SessionManager::new(server, ct.child_token()));
            let config = StreamableHttpServerConfig {
                allowed_origins: settings.allowed_origins,
                allowed_hosts: settings.allowed_hosts,
                ..Default::default()
            };
            let service = StreamableHttpService::new(sessions, config);

            let shutdown = ct.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    shutdown.cancel();
                }
            });

            let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
            service.serve(addr, ct).await?;
        }
    }

    Ok(())
}
