//! # RPC core prelude
//!
//! ```rust
//! use hostdiag_json_rpc::prelude::*;
//! ```

pub use crate::error::{DispatchError, RegistryError};
pub use crate::method::RpcMethod;
pub use crate::processor::RpcProcessor;
pub use crate::registry::{ToolRegistry, ToolRegistryBuilder};
pub use crate::request::RpcRequest;
pub use crate::response::{Outcome, RpcErrorObject, RpcResponse};
pub use crate::tool::{DiagTool, FnTool, ToolArgs, ToolError};
