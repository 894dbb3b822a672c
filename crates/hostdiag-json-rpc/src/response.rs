use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PARSE_ERROR_MESSAGE;

/// Error object carried by a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub message: String,
    /// Registered tool names, present on dispatch and tool-execution errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<String>>,
}

impl RpcErrorObject {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            available: None,
        }
    }

    pub fn with_available(mut self, available: Vec<String>) -> Self {
        self.available = Some(available);
        self
    }
}

/// Either side of the response union. Serialized as a single `result` or
/// `error` key next to `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(RpcErrorObject),
}

/// The `{id, result}` / `{id, error}` envelope returned by every transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn null(id: Value) -> Self {
        Self::success(id, Value::Null)
    }

    pub fn error(id: Value, error: RpcErrorObject) -> Self {
        Self {
            id,
            outcome: Outcome::Error(error),
        }
    }

    /// Envelope for input that could not be parsed; the id is unknowable
    pub fn parse_error() -> Self {
        Self::error(Value::Null, RpcErrorObject::new(PARSE_ERROR_MESSAGE))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&RpcErrorObject> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    /// Serialize for the wire.
    ///
    /// Every field is plain JSON, so serialization cannot fail in practice;
    /// the fallback keeps the contract that a caller always gets an envelope.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            tracing::error!("Failed to serialize response: {}", err);
            r#"{"id":null,"error":{"message":"internal error: response serialization failed"}}"#
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_success_shape() {
        let response = RpcResponse::success(json!(1), json!({"tools": []}));
        assert_eq!(to_value(&response).unwrap(), json!({"id": 1, "result": {"tools": []}}));
    }

    #[test]
    fn test_null_result_is_serialized() {
        let response = RpcResponse::null(json!("x"));
        assert_eq!(to_value(&response).unwrap(), json!({"id": "x", "result": null}));
    }

    #[test]
    fn test_error_shape_with_available() {
        let response = RpcResponse::error(
            json!(2),
            RpcErrorObject::new("unknown method").with_available(vec!["fs.du".into()]),
        );
        assert_eq!(
            to_value(&response).unwrap(),
            json!({"id": 2, "error": {"message": "unknown method", "available": ["fs.du"]}})
        );
    }

    #[test]
    fn test_parse_error_shape() {
        let json_str = RpcResponse::parse_error().to_json_string();
        assert_eq!(
            from_str::<Value>(&json_str).unwrap(),
            json!({"id": null, "error": {"message": "invalid json"}})
        );
    }

    #[test]
    fn test_deserialize_error_response() {
        let parsed: RpcResponse =
            from_str(r#"{"id": 3, "error": {"message": "boom", "available": []}}"#).unwrap();
        assert!(parsed.is_error());
        assert_eq!(parsed.error_object().unwrap().message, "boom");
        assert!(parsed.result().is_none());
    }
}
