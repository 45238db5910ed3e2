//! Startup configuration. Read once; the core treats these values as
//! immutable inputs. An unrecognized transport mode never gets past
//! argument parsing, so no partial server is left listening.

use clap::{Parser, ValueEnum};

/// Which transport the process runs. `stdio` is the single-session pipe
/// mode; `http` is the multi-session streamable HTTP mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    Stdio,
    Http,
}

#[derive(Debug, Parser)]
#[command(
    name = "open-meteo-mcp",
    version,
    about = "Open-Meteo weather tools served over the Model Context Protocol"
)]
pub struct ServerArgs {
    /// Transport mode.
    #[arg(long, env = "MCP_MODE", value_enum, default_value = "stdio")]
    pub mode: TransportMode,

    /// Listen port for HTTP mode.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Comma-separated allowed CORS origins; unset allows any origin.
    #[arg(long, env = "ORIGIN")]
    pub origin: Option<String>,

    /// Comma-separated Host-header allowlist for DNS-rebinding protection.
    /// Unset keeps the default loopback list (`127.0.0.1,localhost`); an
    /// explicit empty value disables the check.
    #[arg(long, env = "ALLOWED_HOSTS")]
    pub allowed_hosts: Option<String>,
}

/// Parsed settings handed to the mode selector.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: TransportMode,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub allowed_hosts: Option<Vec<String>>,
}

impl Settings {
    pub fn from_args(args: ServerArgs) -> Self {
        let allowed_origins = args.origin.as_deref().map(split_csv).unwrap_or_default();
        let allowed_hosts = match args.allowed_hosts.as_deref() {
            None => Some(vec!["127.0.0.1".to_string(), "localhost".to_string()]),
            Some(value) => {
                let hosts = split_csv(value);
                if hosts.is_empty() { None } else { Some(hosts) }
            }
        };
        Self {
            mode: args.mode,
            port: args.port,
            allowed_origins,
            allowed_hosts,
        }
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
