//! `exec.run`: command execution, permanently disabled.
//!
//! The server is read-only. This stub exists so an operator who registers it
//! by hand gets an explicit refusal instead of an unknown-tool error; it is not
//! part of [`crate::default_registry`].

use hostdiag_json_rpc::{DiagTool, ToolArgs, ToolError};
use serde_json::Value;

pub struct ExecRunTool;

impl DiagTool for ExecRunTool {
    fn name(&self) -> &str {
        "exec.run"
    }

    fn description(&self) -> &str {
        "Disabled"
    }

    fn call(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
        Err(ToolError::Disabled(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_run_disabled() {
        let err = ExecRunTool.call(&ToolArgs::empty()).unwrap_err();
        assert!(matches!(err, ToolError::Disabled(_)));
        assert_eq!(err.to_string(), "exec.run is disabled");
    }
}
