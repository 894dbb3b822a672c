//! Request/response access logging with header redaction

use http::{HeaderMap, Method, StatusCode};
use tracing::info;

pub const REDACTED: &str = "<redacted>";

/// Logs one line per request and one per response. Headers named in the
/// redaction list (case-insensitive) never reach the log.
#[derive(Debug, Clone)]
pub struct AccessLog {
    redact: Vec<String>,
}

impl AccessLog {
    pub fn new<I, S>(redact: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            redact: redact
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    fn is_redacted(&self, name: &str) -> bool {
        self.redact.iter().any(|redacted| redacted == name)
    }

    /// Render headers as `{name: value, ...}`
    pub fn format_headers(&self, headers: &HeaderMap) -> String {
        let rendered: Vec<String> = headers
            .iter()
            .map(|(name, value)| {
                // HeaderName is always lowercase
                let value = if self.is_redacted(name.as_str()) {
                    REDACTED.to_string()
                } else {
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                };
                format!("{}: {}", name, value)
            })
            .collect();
        format!("{{{}}}", rendered.join(", "))
    }

    pub fn log_request(&self, method: &Method, path: &str, headers: &HeaderMap) {
        info!("request {} {} {}", method, path, self.format_headers(headers));
    }

    pub fn log_response(&self, status: StatusCode, path: &str) {
        info!("response {} {}", status.as_u16(), path);
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new(["authorization"])
    }
}
