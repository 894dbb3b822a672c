//! Bridge between async transports and the synchronous processor

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use serde_json::Value;
use tracing::error;

use hostdiag_json_rpc::{DispatchError, RpcProcessor, RpcRequest, RpcResponse};

/// Process one parsed value on the blocking pool.
///
/// Tools shell out and walk the filesystem, so they must not run on a runtime
/// worker. A slow tool only ties up its own connection.
pub async fn dispatch(processor: &RpcProcessor, value: Value) -> RpcResponse {
    let id = RpcRequest::from_value(&value).id;
    let worker = processor.clone();

    match tokio::task::spawn_blocking(move || worker.process(&value)).await {
        Ok(response) => response,
        Err(err) => {
            error!("Dispatch task failed: {}", err);
            processor.error_response(id, &DispatchError::Internal(err.to_string()))
        }
    }
}

/// Parse raw transport bytes as JSON
pub fn parse_payload(payload: &[u8]) -> Option<Value> {
    serde_json::from_slice(payload).ok()
}

/// Parse then dispatch. Unparsable input yields the parse-error envelope
/// without reaching the processor.
pub async fn dispatch_payload(processor: &RpcProcessor, payload: &[u8]) -> RpcResponse {
    match parse_payload(payload) {
        Some(value) => dispatch(processor, value).await,
        None => RpcResponse::parse_error(),
    }
}

#[derive(Debug)]
pub enum BodyError {
    TooLarge,
    Read(String),
}

/// Collect a request body, refusing anything beyond `limit` bytes
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(BodyError::TooLarge),
        Err(err) => Err(BodyError::Read(err.to_string())),
    }
}
