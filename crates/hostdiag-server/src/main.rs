//! # hostdiag
//!
//! Local host diagnostics server. Exposes read-only inspection tools (disk
//! usage, large files, package caches, docker storage, top processes) over
//! WebSocket, unary HTTP and Server-Sent Events.
//!
//! ## Usage
//! ```bash
//! hostdiag serve --bind 127.0.0.1:8765
//! hostdiag bridge --listen 0.0.0.0:8766 --upstream ws://127.0.0.1:8765/mcp
//! ```
//!
//! ```bash
//! curl -X POST http://127.0.0.1:8765/mcp-http -d '{"id":1,"method":"tools.list"}'
//! curl -N http://127.0.0.1:8765/mcp-sse
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hostdiag_http_server::{
    BridgeConfig, HttpBridge, HttpDiagServer, RpcProcessor, ServerConfig, StreamConfig,
};

/// Target prefix match: covers `hostdiag_server`, `hostdiag_http_server`,
/// `hostdiag_tools` and `hostdiag_json_rpc`
const DEFAULT_LOG_FILTER: &str = "hostdiag=info";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Options for `serve`, which also runs when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the diagnostics server
    Serve(ServeArgs),
    /// Run the HTTP-to-WebSocket bridge
    Bridge(BridgeArgs),
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    /// Address to bind to
    #[arg(long, env = "HOSTDIAG_BIND", default_value = "127.0.0.1:8765")]
    bind: SocketAddr,

    /// WebSocket endpoint path
    #[arg(long, env = "HOSTDIAG_WS_PATH", default_value = "/mcp")]
    ws_path: String,

    /// Unary HTTP endpoint path
    #[arg(long, env = "HOSTDIAG_HTTP_PATH", default_value = "/mcp-http")]
    http_path: String,

    /// Server-Sent Events endpoint path
    #[arg(long, env = "HOSTDIAG_SSE_PATH", default_value = "/mcp-sse")]
    sse_path: String,

    /// Disable CORS headers
    #[arg(long, env = "HOSTDIAG_NO_CORS")]
    no_cors: bool,

    /// Maximum request body size in bytes
    #[arg(long, env = "HOSTDIAG_MAX_BODY_SIZE", default_value_t = 1024 * 1024)]
    max_body_size: usize,

    /// Queue capacity of each SSE subscriber
    #[arg(long, env = "HOSTDIAG_CHANNEL_BUFFER", default_value_t = 256)]
    channel_buffer: usize,

    /// Seconds between SSE keep-alive comments
    #[arg(long, env = "HOSTDIAG_KEEPALIVE_SECS", default_value_t = 15)]
    keepalive_secs: u64,

    /// Header redacted from the access log (repeatable)
    #[arg(
        long = "redact-header",
        env = "HOSTDIAG_REDACT_HEADERS",
        value_delimiter = ',',
        default_value = "authorization"
    )]
    redact_headers: Vec<String>,
}

impl ServeArgs {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_address: self.bind,
            ws_path: self.ws_path.clone(),
            http_path: self.http_path.clone(),
            sse_path: self.sse_path.clone(),
            enable_cors: !self.no_cors,
            max_body_size: self.max_body_size,
            redact_headers: self.redact_headers.clone(),
            stream: StreamConfig {
                channel_buffer_size: self.channel_buffer,
                keepalive_interval_seconds: self.keepalive_secs,
            },
        }
    }
}

#[derive(Args, Debug, Clone)]
struct BridgeArgs {
    /// Address the bridge listens on
    #[arg(long, env = "HOSTDIAG_BRIDGE_LISTEN", default_value = "0.0.0.0:8766")]
    listen: SocketAddr,

    /// WebSocket URL of the diagnostics server
    #[arg(
        long,
        env = "HOSTDIAG_BRIDGE_UPSTREAM",
        default_value = "ws://127.0.0.1:8765/mcp"
    )]
    upstream: String,

    /// Maximum request body size in bytes
    #[arg(long, env = "HOSTDIAG_BRIDGE_MAX_BODY_SIZE", default_value_t = 1024 * 1024)]
    max_body_size: usize,
}

impl BridgeArgs {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            listen_address: self.listen,
            upstream_url: self.upstream.clone(),
            max_body_size: self.max_body_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve(cli.serve)) {
        Command::Serve(args) => serve(args).await,
        Command::Bridge(args) => bridge(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let registry = hostdiag_tools::default_registry().context("failed to build tool registry")?;
    let processor = RpcProcessor::new(Arc::new(registry));

    let config = args.server_config();
    info!("Starting hostdiag server on {}", config.bind_address);

    let server = HttpDiagServer::builder(processor).config(config).build();
    server.run().await.context("server stopped")?;
    Ok(())
}

async fn bridge(args: BridgeArgs) -> Result<()> {
    let config = args.bridge_config();
    info!(
        "Starting hostdiag bridge on {} -> {}",
        config.listen_address, config.upstream_url
    );

    HttpBridge::new(config).run().await.context("bridge stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_default_log_filter_parses() {
        let filter = EnvFilter::try_new(DEFAULT_LOG_FILTER).unwrap();
        assert_eq!(filter.to_string(), "hostdiag=info");
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_serves_with_defaults() {
        let cli = Cli::try_parse_from(["hostdiag"]).unwrap();
        assert!(cli.command.is_none());

        let config = cli.serve.server_config();
        let defaults = ServerConfig::default();
        assert_eq!(config.bind_address, defaults.bind_address);
        assert_eq!(config.ws_path, defaults.ws_path);
        assert_eq!(config.http_path, defaults.http_path);
        assert_eq!(config.sse_path, defaults.sse_path);
        assert_eq!(config.enable_cors, defaults.enable_cors);
        assert_eq!(config.max_body_size, defaults.max_body_size);
        assert_eq!(config.redact_headers, defaults.redact_headers);
        assert_eq!(config.stream, defaults.stream);
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "hostdiag",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--no-cors",
            "--keepalive-secs",
            "5",
            "--redact-header",
            "authorization",
            "--redact-header",
            "cookie",
        ])
        .unwrap();

        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve subcommand");
        };
        let config = args.server_config();
        assert_eq!(config.bind_address.port(), 9000);
        assert!(!config.enable_cors);
        assert_eq!(config.stream.keepalive_interval_seconds, 5);
        assert_eq!(config.redact_headers, vec!["authorization", "cookie"]);
    }

    #[test]
    fn test_bridge_defaults() {
        let cli = Cli::try_parse_from(["hostdiag", "bridge"]).unwrap();
        let Some(Command::Bridge(args)) = cli.command else {
            panic!("expected bridge subcommand");
        };
        let config = args.bridge_config();
        let defaults = BridgeConfig::default();
        assert_eq!(config.listen_address, defaults.listen_address);
        assert_eq!(config.upstream_url, defaults.upstream_url);
    }
}
