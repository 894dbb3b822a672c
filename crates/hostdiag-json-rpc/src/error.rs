use thiserror::Error;

use crate::tool::ToolError;

/// Failures detected while dispatching a single request.
///
/// None of these escape the processor; each is turned into an error envelope
/// that also lists the registered tools.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown method")]
    UnknownMethod,

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while building a tool registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool registered twice: {0}")]
    DuplicateTool(String),

    #[error("tool name must not be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(DispatchError::UnknownMethod.to_string(), "unknown method");
        assert_eq!(
            DispatchError::UnknownTool("bogus.tool".into()).to_string(),
            "unknown tool: bogus.tool"
        );
        assert_eq!(
            DispatchError::MissingParameter("name").to_string(),
            "missing required parameter: name"
        );
    }

    #[test]
    fn test_tool_error_is_transparent() {
        let err: DispatchError = ToolError::Disabled("exec.run".into()).into();
        assert_eq!(err.to_string(), "exec.run is disabled");
    }
}
