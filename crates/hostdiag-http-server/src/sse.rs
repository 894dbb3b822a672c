//! Stream transport over Server-Sent Events
//!
//! `GET` registers a subscriber and holds the response open. `POST` answers
//! the caller like the unary endpoint, then offers the same serialized
//! response to every subscriber. The subscription lives inside the body
//! stream, so a client disconnect drops it and deregisters the subscriber.

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::{Method, Request, Response};
use tokio::time::{Instant, interval_at};
use tracing::debug;

use crate::Subscription;
use crate::responses::{
    ALLOWED_METHODS, HttpBody, json_text_response, method_not_allowed, options_response,
    with_status,
};
use crate::server::ServerState;
use crate::unary::{EVENT_STREAM, process_post};

pub const KEEPALIVE_FRAME: &str = ": keepalive\n\n";

pub(crate) async fn handle(state: &ServerState, req: Request<Incoming>) -> Response<HttpBody> {
    match *req.method() {
        Method::GET => subscribe(state),
        Method::POST => match process_post(state, req).await {
            Ok(rpc) => {
                let json = rpc.to_json_string();
                let report = state.subscribers.publish(&json);
                debug!(
                    "Published response: delivered={}, dropped={}, removed={}",
                    report.delivered, report.dropped, report.removed
                );
                json_text_response(StatusCode::OK, json)
            }
            Err(rejection) => rejection,
        },
        Method::OPTIONS => options_response(),
        _ => method_not_allowed(ALLOWED_METHODS),
    }
}

/// Register a subscriber and answer with its event stream
pub(crate) fn subscribe(state: &ServerState) -> Response<HttpBody> {
    let keepalive = Duration::from_secs(state.config.stream.keepalive_interval_seconds.max(1));
    event_stream_response(state.subscribers.subscribe(), keepalive)
}

pub fn event_stream_response(subscription: Subscription, keepalive: Duration) -> Response<HttpBody> {
    let body = StreamBody::new(
        event_stream(subscription, keepalive)
            .map(|frame| Ok::<_, hyper::Error>(Frame::data(Bytes::from(frame)))),
    )
    .boxed_unsync();

    let mut response = with_status(StatusCode::OK, body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// SSE frames for one subscriber: every published payload, plus a comment
/// line whenever `keepalive` passes without traffic on the timer
pub fn event_stream(
    mut subscription: Subscription,
    keepalive: Duration,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let mut ticker = interval_at(Instant::now() + keepalive, keepalive);
        debug!("Event stream opened for subscriber {}", subscription.id());

        loop {
            let frame = tokio::select! {
                payload = subscription.recv() => match payload {
                    Some(payload) => format_data_frame(&payload),
                    None => break,
                },
                _ = ticker.tick() => KEEPALIVE_FRAME.to_string(),
            };
            yield frame;
        }
    }
}

/// Encode a payload as one SSE `data` event
pub fn format_data_frame(payload: &str) -> String {
    let mut frame = String::with_capacity(payload.len() + 8);
    for line in payload.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line.strip_suffix('\r').unwrap_or(line));
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubscriberRegistry;
    use std::pin::pin;

    #[test]
    fn test_format_data_frame() {
        assert_eq!(format_data_frame(r#"{"id":1}"#), "data: {\"id\":1}\n\n");
        assert_eq!(format_data_frame("a\nb"), "data: a\ndata: b\n\n");
    }

    #[tokio::test]
    async fn test_event_stream_yields_published_payloads() {
        let registry = SubscriberRegistry::new(4);
        let mut stream = pin!(event_stream(registry.subscribe(), Duration::from_secs(60)));

        registry.publish(r#"{"id":7,"result":null}"#);
        assert_eq!(
            stream.next().await.unwrap(),
            "data: {\"id\":7,\"result\":null}\n\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_stream_keepalive() {
        let registry = SubscriberRegistry::new(4);
        let mut stream = pin!(event_stream(registry.subscribe(), Duration::from_secs(15)));
        assert_eq!(stream.next().await.unwrap(), KEEPALIVE_FRAME);
    }

    #[tokio::test]
    async fn test_dropping_stream_deregisters() {
        let registry = SubscriberRegistry::new(4);
        let response = event_stream_response(registry.subscribe(), Duration::from_secs(60));
        assert_eq!(registry.len(), 1);
        assert_eq!(response.headers()[CONTENT_TYPE], EVENT_STREAM);

        drop(response);
        assert!(registry.is_empty());
    }
}
