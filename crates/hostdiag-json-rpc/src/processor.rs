//! RPC Processor
//!
//! Interprets one parsed request, dispatches lifecycle or tool-invocation
//! methods and always produces a response envelope. Holds no mutable state
//! between calls, so one instance is shared by every transport and
//! connection.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::method::RpcMethod;
use crate::registry::ToolRegistry;
use crate::request::RpcRequest;
use crate::response::{RpcErrorObject, RpcResponse};
use crate::tool::ToolArgs;

#[derive(Debug, Clone)]
pub struct RpcProcessor {
    registry: Arc<ToolRegistry>,
}

impl RpcProcessor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Registered tool names in registration order
    pub fn tool_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Process a parsed JSON value
    pub fn process(&self, value: &Value) -> RpcResponse {
        self.process_request(&RpcRequest::from_value(value))
    }

    /// Process a request. Never panics: a panic raised while dispatching,
    /// including one raised inside a tool, becomes an internal error envelope
    /// carrying the request id.
    pub fn process_request(&self, request: &RpcRequest) -> RpcResponse {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request)))
            .unwrap_or_else(|payload| Err(DispatchError::Internal(panic_message(payload.as_ref()))));

        match outcome {
            Ok(result) => RpcResponse::success(request.id.clone(), result),
            Err(err) => self.error_response(request.id.clone(), &err),
        }
    }

    /// Build an error envelope. `available` is attached here and only here,
    /// so every dispatch and tool failure carries the tool list.
    pub fn error_response(&self, id: Value, err: &DispatchError) -> RpcResponse {
        RpcResponse::error(
            id,
            RpcErrorObject::new(err.to_string()).with_available(self.tool_names()),
        )
    }

    fn dispatch(&self, request: &RpcRequest) -> Result<Value, DispatchError> {
        let method = request.rpc_method();
        debug!("Dispatching request: id={}, method={}", request.id, method);

        match method {
            RpcMethod::Initialize => Ok(json!({ "capabilities": {} })),
            RpcMethod::Shutdown | RpcMethod::Exit => Ok(Value::Null),
            RpcMethod::ToolsList => Ok(json!({ "tools": self.tool_names() })),
            RpcMethod::ToolsCall => self.call_tool(request),
            RpcMethod::Unknown(name) => {
                debug!("Unknown method: {:?}", name);
                Err(DispatchError::UnknownMethod)
            }
        }
    }

    fn call_tool(&self, request: &RpcRequest) -> Result<Value, DispatchError> {
        let name = match request.get_param("name") {
            None | Some(Value::Null) => return Err(DispatchError::MissingParameter("name")),
            Some(Value::String(name)) => name.as_str(),
            Some(other) => {
                return Err(DispatchError::InvalidParameter {
                    name: "name",
                    reason: format!("expected string, got {}", other),
                });
            }
        };

        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let arguments = match request.get_param("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments.clone(),
            Some(other) => {
                return Err(DispatchError::InvalidParameter {
                    name: "arguments",
                    reason: format!("expected object, got {}", other),
                });
            }
        };

        let data = tool.call(&ToolArgs::new(arguments)).map_err(|err| {
            warn!("Tool {} failed: {}", name, err);
            DispatchError::Tool(err)
        })?;

        Ok(json!({ "name": name, "data": data }))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_string()
    }
}
