use std::fmt;

use crate::methods;

/// Closed set of methods the processor dispatches on.
///
/// Tools are an open, name-indexed set and live in the registry; methods are
/// fixed by the protocol and matched here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcMethod {
    Initialize,
    Shutdown,
    Exit,
    ToolsList,
    ToolsCall,
    Unknown(String),
}

impl RpcMethod {
    pub fn parse(name: &str) -> Self {
        match name {
            methods::INITIALIZE => RpcMethod::Initialize,
            methods::SHUTDOWN => RpcMethod::Shutdown,
            methods::EXIT => RpcMethod::Exit,
            methods::TOOLS_LIST => RpcMethod::ToolsList,
            methods::TOOLS_CALL => RpcMethod::ToolsCall,
            other => RpcMethod::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RpcMethod::Initialize => methods::INITIALIZE,
            RpcMethod::Shutdown => methods::SHUTDOWN,
            RpcMethod::Exit => methods::EXIT,
            RpcMethod::ToolsList => methods::TOOLS_LIST,
            RpcMethod::ToolsCall => methods::TOOLS_CALL,
            RpcMethod::Unknown(name) => name,
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_methods() {
        assert_eq!(RpcMethod::parse("initialize"), RpcMethod::Initialize);
        assert_eq!(RpcMethod::parse("tools.list"), RpcMethod::ToolsList);
        assert_eq!(RpcMethod::parse("tools.call"), RpcMethod::ToolsCall);
        assert_eq!(
            RpcMethod::parse("tools/list"),
            RpcMethod::Unknown("tools/list".to_string())
        );
    }
}
