//! # hostdiag tools
//!
//! Read-only host-inspection tools behind the [`DiagTool`] contract:
//!
//! | name | returns |
//! |---|---|
//! | `fs.du` | `[{path, kb}]` |
//! | `fs.bigfiles` | `[{path, size}]` |
//! | `pkg.caches` | `{brew_kb, npm_kb, pip_kb}` |
//! | `docker.df` | `{raw: [..]}` |
//! | `proc.top` | `[{pid, name, mem_pct, cpu_pct, cmd}]` |

pub mod command;
pub mod docker;
pub mod exec;
pub mod fs;
pub mod pkg;
pub mod process;

pub use docker::DockerDfTool;
pub use exec::ExecRunTool;
pub use fs::{BigFilesTool, DiskUsageTool};
pub use pkg::PackageCachesTool;
pub use process::TopProcessesTool;

use hostdiag_json_rpc::{DiagTool, RegistryError, ToolRegistry, ToolRegistryBuilder};

/// Add the default tool set to `builder`, in listing order
pub fn register_defaults(builder: ToolRegistryBuilder) -> ToolRegistryBuilder {
    builder
        .tool(DiskUsageTool)
        .tool(BigFilesTool)
        .tool(PackageCachesTool)
        .tool(DockerDfTool)
        .tool(TopProcessesTool)
}

/// Registry with every default tool. `exec.run` is not included.
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    register_defaults(ToolRegistry::builder()).build()
}
