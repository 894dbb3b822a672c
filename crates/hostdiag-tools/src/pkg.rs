//! Package-manager cache sizing: `pkg.caches`

use std::path::{Path, PathBuf};

use hostdiag_json_rpc::tool::home_dir;
use hostdiag_json_rpc::{DiagTool, ToolArgs, ToolError};
use serde::Serialize;
use serde_json::Value;

use crate::command;
use crate::fs::to_value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageCaches {
    pub brew_kb: u64,
    pub npm_kb: u64,
    pub pip_kb: u64,
}

/// Sizes of the Homebrew, npm and pip caches. A manager that is not
/// installed, or a cache that does not exist, counts as 0.
pub fn pkg_caches() -> PackageCaches {
    let home = home_dir();
    let brew = query_path("brew", &["--cache"]);
    let npm = query_path("npm", &["config", "get", "cache"]);
    let pip = home.join(".cache").join("pip");

    PackageCaches {
        brew_kb: du_sk(brew.as_deref()),
        npm_kb: du_sk(npm.as_deref()),
        pip_kb: du_sk(Some(&pip)),
    }
}

/// Ask a package manager where its cache lives
fn query_path(program: &str, args: &[&str]) -> Option<PathBuf> {
    let stdout = command::run(program, args).ok()?.into_stdout().ok()?;
    let trimmed = stdout.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Total size of `path` in KiB, 0 on any failure
fn du_sk(path: Option<&Path>) -> u64 {
    let Some(path) = path.filter(|path| path.exists()) else {
        return 0;
    };

    command::run("du", [std::ffi::OsStr::new("-sk"), path.as_os_str()])
        .ok()
        .and_then(|output| {
            output
                .stdout
                .split_whitespace()
                .next()
                .and_then(|kb| kb.parse().ok())
        })
        .unwrap_or(0)
}

pub struct PackageCachesTool;

impl DiagTool for PackageCachesTool {
    fn name(&self) -> &str {
        "pkg.caches"
    }

    fn description(&self) -> &str {
        "Disk usage of brew, npm and pip caches in KiB"
    }

    fn call(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
        to_value(pkg_caches())
    }
}
