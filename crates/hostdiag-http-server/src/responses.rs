//! Response construction shared by every endpoint

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::Response;

use hostdiag_json_rpc::RpcResponse;

/// Body type of every response produced by the server
pub type HttpBody = UnsyncBoxBody<Bytes, hyper::Error>;

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Methods accepted by the unary and stream endpoints
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

pub fn full_body(data: impl Into<Bytes>) -> HttpBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed_unsync()
}

pub fn empty_body() -> HttpBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn with_status(status: StatusCode, body: HttpBody) -> Response<HttpBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

pub fn empty_response(status: StatusCode) -> Response<HttpBody> {
    with_status(status, empty_body())
}

pub fn text_response(status: StatusCode, text: impl Into<String>) -> Response<HttpBody> {
    let mut response = with_status(status, full_body(text.into()));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

pub fn json_text_response(status: StatusCode, json: String) -> Response<HttpBody> {
    let mut response = with_status(status, full_body(json));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    response
}

pub fn rpc_response(status: StatusCode, rpc: &RpcResponse) -> Response<HttpBody> {
    json_text_response(status, rpc.to_json_string())
}

/// 200 with `Allow`, the answer to a capability probe
pub fn options_response() -> Response<HttpBody> {
    let mut response = empty_response(StatusCode::OK);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

pub fn method_not_allowed(allow: &'static str) -> Response<HttpBody> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

pub fn not_found() -> Response<HttpBody> {
    text_response(StatusCode::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(response: Response<HttpBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_rpc_response_is_json() {
        let response = rpc_response(StatusCode::BAD_REQUEST, &RpcResponse::parse_error());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_JSON);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"]["message"], "invalid json");
    }

    #[tokio::test]
    async fn test_options_response() {
        let response = options_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ALLOW], "GET, POST, OPTIONS");
        assert!(body_string(response).await.is_empty());
    }

    #[test]
    fn test_method_not_allowed_carries_allow() {
        let response = method_not_allowed(ALLOWED_METHODS);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], ALLOWED_METHODS);
    }
}
