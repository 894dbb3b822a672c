//! Unary transport: one request per HTTP exchange

use http::header::ACCEPT;
use http::{HeaderMap, StatusCode};
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use tracing::debug;

use hostdiag_json_rpc::RpcResponse;

use crate::dispatch::{BodyError, dispatch, parse_payload, read_body};
use crate::responses::{
    ALLOWED_METHODS, HttpBody, method_not_allowed, options_response, rpc_response, text_response,
};
use crate::server::ServerState;
use crate::sse;

pub const EVENT_STREAM: &str = "text/event-stream";

pub(crate) async fn handle(state: &ServerState, req: Request<Incoming>) -> Response<HttpBody> {
    match *req.method() {
        Method::POST => match process_post(state, req).await {
            Ok(rpc) => rpc_response(StatusCode::OK, &rpc),
            Err(rejection) => rejection,
        },
        Method::GET => {
            if accepts_event_stream(req.headers()) {
                sse::subscribe(state)
            } else {
                text_response(
                    StatusCode::NOT_ACCEPTABLE,
                    format!("GET requires Accept: {}", EVENT_STREAM),
                )
            }
        }
        Method::OPTIONS => options_response(),
        _ => method_not_allowed(ALLOWED_METHODS),
    }
}

/// Read, parse and process a POST body.
///
/// `Err` carries the finished rejection: 413 over the size limit, 400 with the
/// parse-error envelope for anything that is not JSON. The processor is not
/// invoked in either case.
pub(crate) async fn process_post(
    state: &ServerState,
    req: Request<Incoming>,
) -> Result<RpcResponse, Response<HttpBody>> {
    let limit = state.config.max_body_size;
    let body = match read_body(req.into_body(), limit).await {
        Ok(body) => body,
        Err(BodyError::TooLarge) => {
            return Err(text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {} bytes", limit),
            ));
        }
        Err(BodyError::Read(reason)) => {
            debug!("Failed to read request body: {}", reason);
            return Err(rpc_response(StatusCode::BAD_REQUEST, &RpcResponse::parse_error()));
        }
    };

    match parse_payload(&body) {
        Some(value) => Ok(dispatch(&state.processor, value).await),
        None => Err(rpc_response(StatusCode::BAD_REQUEST, &RpcResponse::parse_error())),
    }
}

/// Whether the `Accept` header asks for an event stream
pub fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|media| {
            media
                .split(';')
                .next()
                .is_some_and(|media| media.trim().eq_ignore_ascii_case(EVENT_STREAM))
        })
}
