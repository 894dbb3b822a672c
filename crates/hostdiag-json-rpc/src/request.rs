use serde_json::{Map, Value};

use crate::method::RpcMethod;

/// A request as seen by the processor.
///
/// Built leniently from any parsed JSON value: transports only guarantee that
/// the bytes were valid JSON, so every field is optional here and the
/// processor decides what a missing or mistyped field means.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Correlation token, echoed verbatim. `Null` when absent.
    pub id: Value,
    /// Method name, `None` when missing or not a string
    pub method: Option<String>,
    /// Named parameters, `None` when missing or not an object
    pub params: Option<Map<String, Value>>,
}

impl RpcRequest {
    /// Extract id, method and params from an arbitrary JSON value
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self {
                id: Value::Null,
                method: None,
                params: None,
            };
        };

        Self {
            id: object.get("id").cloned().unwrap_or(Value::Null),
            method: object
                .get("method")
                .and_then(Value::as_str)
                .map(str::to_string),
            params: object.get("params").and_then(Value::as_object).cloned(),
        }
    }

    /// The method this request targets
    pub fn rpc_method(&self) -> RpcMethod {
        RpcMethod::parse(self.method.as_deref().unwrap_or_default())
    }

    /// Get a parameter by name
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full_request() {
        let request = RpcRequest::from_value(&json!({
            "id": 7,
            "method": "tools.call",
            "params": {"name": "fs.du", "arguments": {"depth": 1}}
        }));

        assert_eq!(request.id, json!(7));
        assert_eq!(request.method.as_deref(), Some("tools.call"));
        assert_eq!(request.get_param("name"), Some(&json!("fs.du")));
        assert_eq!(request.rpc_method(), RpcMethod::ToolsCall);
    }

    #[test]
    fn test_missing_id_becomes_null() {
        let request = RpcRequest::from_value(&json!({"method": "tools.list"}));
        assert_eq!(request.id, Value::Null);
        assert!(request.params.is_none());
    }

    #[test]
    fn test_non_object_value() {
        let request = RpcRequest::from_value(&json!([1, 2, 3]));
        assert_eq!(request.id, Value::Null);
        assert!(request.method.is_none());
        assert!(matches!(request.rpc_method(), RpcMethod::Unknown(_)));
    }

    #[test]
    fn test_non_string_method_is_dropped() {
        let request = RpcRequest::from_value(&json!({"id": "a", "method": 42}));
        assert_eq!(request.id, json!("a"));
        assert!(request.method.is_none());
    }
}
