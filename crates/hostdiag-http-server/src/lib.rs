//! # hostdiag HTTP server
//!
//! Network transports for the hostdiag RPC processor. One listener serves
//! three delivery styles over the same processor:
//!
//! - **Duplex**: a WebSocket at `ws_path`, one response per inbound message
//! - **Unary**: `POST http_path`, one request per HTTP exchange
//! - **Stream**: `GET sse_path` subscribes to Server-Sent Events, `POST sse_path`
//!   answers the caller and fans the response out to every subscriber
//!
//! Plus a health probe at `/` and an optional HTTP-to-WebSocket [`bridge`].

pub mod access_log;
pub mod bridge;
pub mod cors;
pub mod dispatch;
pub mod health;
pub mod responses;
pub mod server;
pub mod sse;
pub mod subscribers;
pub mod unary;
pub mod websocket;

// Re-export main types
pub use access_log::AccessLog;
pub use bridge::{BridgeConfig, HttpBridge};
pub use cors::CorsLayer;
pub use dispatch::dispatch;
pub use server::{HttpDiagServer, HttpDiagServerBuilder, ServerConfig, StreamConfig};
pub use subscribers::{PublishReport, SubscriberId, SubscriberRegistry, Subscription};

// Re-export foundational types
pub use hostdiag_json_rpc::{RpcProcessor, RpcResponse, ToolRegistry};

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, HttpDiagError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpDiagError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("upstream closed before replying")]
    UpstreamClosed,
}
