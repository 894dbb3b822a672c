//! Liveness probe served at `/`

use chrono::{DateTime, SecondsFormat, Utc};
use http::StatusCode;
use hyper::Response;

use crate::responses::{HttpBody, text_response};

pub const HEALTH_PREFIX: &str = "mcp:ok";

pub fn health_text(now: DateTime<Utc>) -> String {
    format!(
        "{} {}",
        HEALTH_PREFIX,
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

pub fn health_response() -> Response<HttpBody> {
    text_response(StatusCode::OK, health_text(Utc::now()))
}
