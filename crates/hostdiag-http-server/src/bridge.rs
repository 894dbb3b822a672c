//! HTTP-to-WebSocket bridge
//!
//! For clients that can only issue plain HTTP requests. Each `POST /mcp-http`
//! opens a short-lived WebSocket connection to the upstream server, sends the
//! body as one text message and returns the first reply.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use http::StatusCode;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use hostdiag_json_rpc::{RpcErrorObject, RpcResponse};

use crate::dispatch::{BodyError, read_body};
use crate::responses::{
    HttpBody, json_text_response, method_not_allowed, not_found, rpc_response, text_response,
};
use crate::{HttpDiagError, Result};

pub const BRIDGE_HEALTH: &str = "mcp-proxy:ok";
pub const BRIDGE_PATH: &str = "/mcp-http";

/// Configuration for the bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the bridge listens on
    pub listen_address: SocketAddr,
    /// WebSocket URL of the diagnostics server
    pub upstream_url: String,
    /// Maximum request body size
    pub max_body_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 8766)),
            upstream_url: "ws://127.0.0.1:8765/mcp".to_string(),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpBridge {
    config: Arc<BridgeConfig>,
}

impl HttpBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_address).await?;
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("hostdiag bridge listening on {}", listener.local_addr()?);
        info!("Forwarding {} to {}", BRIDGE_PATH, self.config.upstream_url);

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New bridge connection from {}", peer_addr);

            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| handle_request(req, Arc::clone(&config)));

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving bridge connection: {}", err);
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    config: Arc<BridgeConfig>,
) -> std::result::Result<Response<HttpBody>, Infallible> {
    let path = req.uri().path().to_string();
    debug!("Bridge handling {} {}", req.method(), path);

    let response = match (req.method(), path.as_str()) {
        (&Method::GET, "/") => text_response(StatusCode::OK, BRIDGE_HEALTH),
        (&Method::POST, BRIDGE_PATH) => {
            match read_body(req.into_body(), config.max_body_size).await {
                Ok(body) => {
                    let payload = String::from_utf8_lossy(&body).into_owned();
                    match forward(&config.upstream_url, payload).await {
                        Ok(reply) => json_text_response(StatusCode::OK, reply),
                        Err(err) => {
                            warn!("Upstream {} unavailable: {}", config.upstream_url, err);
                            upstream_unavailable(&err)
                        }
                    }
                }
                Err(BodyError::TooLarge) => text_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("request body exceeds {} bytes", config.max_body_size),
                ),
                Err(BodyError::Read(reason)) => {
                    text_response(StatusCode::BAD_REQUEST, format!("failed to read body: {}", reason))
                }
            }
        }
        (_, "/") => method_not_allowed("GET"),
        (_, BRIDGE_PATH) => method_not_allowed("POST"),
        _ => not_found(),
    };

    Ok(response)
}

fn upstream_unavailable(err: &HttpDiagError) -> Response<HttpBody> {
    let envelope = RpcResponse::error(
        Value::Null,
        RpcErrorObject::new(format!("upstream unavailable: {}", err)),
    );
    rpc_response(StatusCode::BAD_GATEWAY, &envelope)
}

/// Send `payload` upstream and wait for the first data message in reply
pub async fn forward(upstream_url: &str, payload: String) -> Result<String> {
    let (mut socket, _) = connect_async(upstream_url).await?;
    socket.send(Message::text(payload)).await?;

    let reply = loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => break text.to_string(),
            Some(Ok(Message::Binary(bytes))) => {
                break String::from_utf8_lossy(&bytes).into_owned();
            }
            Some(Ok(Message::Close(_))) | None => return Err(HttpDiagError::UpstreamClosed),
            Some(Ok(_)) => continue,
            Some(Err(err)) => return Err(err.into()),
        }
    };

    if let Err(err) = socket.close(None).await {
        debug!("Closing upstream socket: {}", err);
    }
    Ok(reply)
}
