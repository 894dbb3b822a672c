//! Duplex transport over WebSocket
//!
//! The handshake is answered by hyper; the upgraded connection is handed to
//! `tokio-tungstenite`. Each connection gets one task that processes messages
//! strictly in arrival order, one response per inbound message.

use futures::{SinkExt, StreamExt};
use http::header::{CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, UPGRADE};
use http::{HeaderMap, HeaderValue, StatusCode};
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing::{debug, warn};

use hostdiag_json_rpc::{RpcProcessor, RpcResponse};

use crate::dispatch::dispatch_payload;
use crate::responses::{HttpBody, empty_response, method_not_allowed, text_response};
use crate::server::ServerState;

pub(crate) fn handle(state: &ServerState, req: Request<Incoming>) -> Response<HttpBody> {
    if *req.method() != Method::GET {
        return method_not_allowed("GET");
    }
    if !is_upgrade_request(req.headers()) {
        let mut response = text_response(StatusCode::UPGRADE_REQUIRED, "WebSocket upgrade required");
        response
            .headers_mut()
            .insert(UPGRADE, HeaderValue::from_static("websocket"));
        return response;
    }
    let Some(key) = req.headers().get(SEC_WEBSOCKET_KEY) else {
        return text_response(StatusCode::BAD_REQUEST, "missing Sec-WebSocket-Key");
    };
    let accept = derive_accept_key(key.as_bytes());
    let Ok(accept) = HeaderValue::from_str(&accept) else {
        return text_response(StatusCode::BAD_REQUEST, "invalid Sec-WebSocket-Key");
    };

    let processor = state.processor.clone();
    tokio::spawn(async move {
        match hyper::upgrade::on(req).await {
            Ok(upgraded) => {
                let socket =
                    WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None)
                        .await;
                serve_socket(processor, socket).await;
            }
            Err(err) => warn!("WebSocket upgrade failed: {}", err),
        }
    });

    let mut response = empty_response(StatusCode::SWITCHING_PROTOCOLS);
    let headers = response.headers_mut();
    headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(SEC_WEBSOCKET_ACCEPT, accept);
    response
}

/// Whether the request asks to switch to the WebSocket protocol
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("websocket"))
        });
    let connection = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    upgrade && connection
}

/// Run the message loop of one connection until the peer goes away.
///
/// Request-level failures are answered on the socket and never end the loop;
/// only a close frame, end of stream or a transport error does.
pub async fn serve_socket<S>(processor: RpcProcessor, mut socket: WebSocketStream<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!("WebSocket connection opened");

    while let Some(message) = socket.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                debug!("WebSocket read error: {}", err);
                break;
            }
        };

        let response = match message {
            Message::Text(text) => dispatch_payload(&processor, text.as_str().as_bytes()).await,
            Message::Binary(bytes) => {
                if std::str::from_utf8(&bytes).is_ok() {
                    dispatch_payload(&processor, &bytes).await
                } else {
                    RpcResponse::parse_error()
                }
            }
            Message::Close(_) => break,
            // pongs are queued by tungstenite and flushed on the next read
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        if let Err(err) = socket.send(Message::text(response.to_json_string())).await {
            debug!("WebSocket write error: {}", err);
            break;
        }
    }

    debug!("WebSocket connection closed");
}
