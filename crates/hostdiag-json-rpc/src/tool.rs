//! Tool contract
//!
//! A tool is a named, read-only host-inspection capability. It receives an
//! arguments object whose keys are all optional, applies its own defaults and
//! returns JSON-serializable data.

use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;

/// Failures a tool can report. The message is passed to the caller verbatim.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("required utility not found: {0}")]
    MissingUtility(String),

    #[error("{program} failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is disabled")]
    Disabled(String),

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Arguments passed to a tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw access. `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// String argument; absent, `null` and `""` fall back to `default`
    pub fn str_or(&self, key: &str, default: &str) -> Result<String, ToolError> {
        match self.get(key) {
            None => Ok(default.to_string()),
            Some(Value::String(s)) if s.is_empty() => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ToolError::invalid_argument(
                key,
                format!("expected string, got {}", json_type(other)),
            )),
        }
    }

    /// Non-negative integer argument. Accepts JSON integers, integral floats
    /// and numeric strings.
    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64, ToolError> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };

        let parsed = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
            Value::String(s) if s.trim().is_empty() => return Ok(default),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        parsed.ok_or_else(|| {
            ToolError::invalid_argument(key, format!("expected non-negative integer, got {}", value))
        })
    }

    /// Filesystem path argument defaulting to the invoking user's home.
    ///
    /// Paths are handed to external utilities as operands, so a leading `-`
    /// is refused: `find` and `du` would read it as an option.
    pub fn path_or_home(&self, key: &str) -> Result<PathBuf, ToolError> {
        let home = home_dir();
        let raw = self.str_or(key, &home.to_string_lossy())?;
        if raw.starts_with('-') {
            return Err(ToolError::invalid_argument(
                key,
                format!("path must not start with '-', got {:?}", raw),
            ));
        }
        Ok(expand_tilde(&raw, &home))
    }
}

impl From<Map<String, Value>> for ToolArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Home directory of the invoking user, `/` when `HOME` is unset
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

fn expand_tilde(raw: &str, home: &std::path::Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A registered host-inspection capability
pub trait DiagTool: Send + Sync {
    /// Dotted-namespace name, e.g. `fs.du`
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Run the tool. May block on host commands.
    fn call(&self, args: &ToolArgs) -> Result<Value, ToolError>;
}

type ToolFn = dyn Fn(&ToolArgs) -> Result<Value, ToolError> + Send + Sync;

/// A closure-backed tool
pub struct FnTool {
    name: String,
    description: String,
    handler: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ToolArgs) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            handler: Box::new(handler),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl DiagTool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn call(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        (self.handler)(args)
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}
