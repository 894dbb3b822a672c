//! # hostdiag RPC core
//!
//! A transport-agnostic request processor for the hostdiag protocol.
//! This crate provides the envelope types, the tool contract, the tool registry
//! and the dispatch logic without any transport-specific code.
//!
//! ## Features
//! - One response shape for every transport (`{id, result}` or `{id, error}`)
//! - Immutable, name-indexed tool registry built once at startup
//! - Lifecycle methods (`initialize`, `shutdown`, `exit`) that never fail
//! - Every dispatch and tool failure reported with the list of available tools

pub mod error;
pub mod method;
pub mod processor;
pub mod registry;
pub mod request;
pub mod response;
pub mod tool;

pub mod prelude;

// Re-export main types
pub use error::{DispatchError, RegistryError};
pub use method::RpcMethod;
pub use processor::RpcProcessor;
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use request::RpcRequest;
pub use response::{Outcome, RpcErrorObject, RpcResponse};
pub use tool::{DiagTool, FnTool, ToolArgs, ToolError};

/// Method names understood by the processor
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";
    pub const TOOLS_LIST: &str = "tools.list";
    pub const TOOLS_CALL: &str = "tools.call";
}

/// Message carried by the envelope returned for unparsable input
pub const PARSE_ERROR_MESSAGE: &str = "invalid json";
