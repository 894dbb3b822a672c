//! HTTP diagnostics server
//!
//! One listener, one task per TCP connection. Requests are routed by path to
//! the health probe or to one of the three transports.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use hostdiag_json_rpc::RpcProcessor;

use crate::responses::{HttpBody, method_not_allowed, not_found};
use crate::{AccessLog, CorsLayer, Result, SubscriberRegistry, health, sse, unary, websocket};

/// Configuration for the stream transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Capacity of each subscriber's queue
    pub channel_buffer_size: usize,
    /// Keep-alive interval in seconds
    pub keepalive_interval_seconds: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 256,
            keepalive_interval_seconds: 15,
        }
    }
}

/// Configuration for the HTTP diagnostics server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path of the WebSocket endpoint
    pub ws_path: String,
    /// Path of the unary endpoint
    pub http_path: String,
    /// Path of the stream endpoint
    pub sse_path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Header names replaced by `<redacted>` in the access log
    pub redact_headers: Vec<String>,
    /// Stream transport settings
    pub stream: StreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8765)),
            ws_path: "/mcp".to_string(),
            http_path: "/mcp-http".to_string(),
            sse_path: "/mcp-sse".to_string(),
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
            redact_headers: vec!["authorization".to_string()],
            stream: StreamConfig::default(),
        }
    }
}

/// Builder for [`HttpDiagServer`]
pub struct HttpDiagServerBuilder {
    config: ServerConfig,
    processor: RpcProcessor,
}

impl HttpDiagServerBuilder {
    pub fn new(processor: RpcProcessor) -> Self {
        Self {
            config: ServerConfig::default(),
            processor,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the WebSocket endpoint path
    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        self.config.ws_path = path.into();
        self
    }

    /// Set the unary endpoint path
    pub fn http_path(mut self, path: impl Into<String>) -> Self {
        self.config.http_path = path.into();
        self
    }

    /// Set the stream endpoint path
    pub fn sse_path(mut self, path: impl Into<String>) -> Self {
        self.config.sse_path = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Header names to redact from the access log
    pub fn redact_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.redact_headers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Configure SSE streaming settings
    pub fn stream_config(mut self, config: StreamConfig) -> Self {
        self.config.stream = config;
        self
    }

    pub fn build(self) -> HttpDiagServer {
        let state = ServerState {
            subscribers: SubscriberRegistry::new(self.config.stream.channel_buffer_size),
            access_log: AccessLog::new(&self.config.redact_headers),
            processor: self.processor,
            config: self.config,
        };

        HttpDiagServer {
            state: Arc::new(state),
        }
    }
}

/// State shared by every connection
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) processor: RpcProcessor,
    pub(crate) subscribers: SubscriberRegistry,
    pub(crate) access_log: AccessLog,
}

#[derive(Clone)]
pub struct HttpDiagServer {
    state: Arc<ServerState>,
}

impl HttpDiagServer {
    pub fn builder(processor: RpcProcessor) -> HttpDiagServerBuilder {
        HttpDiagServerBuilder::new(processor)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Subscribers of the stream transport
    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.state.subscribers
    }

    /// Bind the configured address and serve until an accept error
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.state.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let config = &self.state.config;
        info!("hostdiag server listening on {}", listener.local_addr()?);
        info!(
            "Endpoints: ws={} http={} sse={}",
            config.ws_path, config.http_path, config.sse_path
        );
        info!("Tools: {}", self.state.processor.tool_names().join(", "));

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| handle_request(req, Arc::clone(&state)));

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .with_upgrades()
                    .await
                {
                    let err_str = err.to_string();
                    if err_str.contains("connection closed before message completed") {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<ServerState>,
) -> std::result::Result<Response<HttpBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    state.access_log.log_request(&method, &path, req.headers());

    let config = &state.config;
    let mut response = if path == "/" {
        if method == Method::GET {
            health::health_response()
        } else {
            method_not_allowed("GET")
        }
    } else if path == config.ws_path {
        websocket::handle(&state, req)
    } else if path == config.http_path {
        unary::handle(&state, req).await
    } else if path == config.sse_path {
        sse::handle(&state, req).await
    } else {
        not_found()
    };

    if config.enable_cors {
        CorsLayer::apply_cors_headers(response.headers_mut());
    }
    state.access_log.log_response(response.status(), &path);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostdiag_json_rpc::ToolRegistry;
    use std::net::{IpAddr, Ipv4Addr};

    fn processor() -> RpcProcessor {
        RpcProcessor::new(Arc::new(ToolRegistry::default()))
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8765");
        assert_eq!(config.ws_path, "/mcp");
        assert_eq!(config.http_path, "/mcp-http");
        assert_eq!(config.sse_path, "/mcp-sse");
        assert!(config.enable_cors);
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert_eq!(config.redact_headers, vec!["authorization"]);
        assert_eq!(config.stream.channel_buffer_size, 256);
        assert_eq!(config.stream.keepalive_interval_seconds, 15);
    }

    #[test]
    fn test_builder() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000);
        let server = HttpDiagServer::builder(processor())
            .bind_address(addr)
            .ws_path("/ws")
            .http_path("/rpc")
            .sse_path("/events")
            .cors(false)
            .max_body_size(2048)
            .redact_headers(["cookie"])
            .stream_config(StreamConfig {
                channel_buffer_size: 8,
                keepalive_interval_seconds: 1,
            })
            .build();

        let config = server.config();
        assert_eq!(config.bind_address, addr);
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.http_path, "/rpc");
        assert_eq!(config.sse_path, "/events");
        assert!(!config.enable_cors);
        assert_eq!(config.max_body_size, 2048);
        assert_eq!(config.redact_headers, vec!["cookie"]);
        assert_eq!(config.stream.channel_buffer_size, 8);
        assert!(server.subscribers().is_empty());
    }
}
