//! Container storage usage: `docker.df`

use hostdiag_json_rpc::{DiagTool, ToolArgs, ToolError};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::command;
use crate::fs::to_value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockerDf {
    /// One JSON document per line, as printed by docker
    pub raw: Vec<String>,
}

/// Output of `docker system df`. Docker missing, the daemon down or any
/// other failure yields an empty list rather than an error.
pub fn docker_df() -> DockerDf {
    let raw = match command::run("docker", ["system", "df", "--format", "{{json .}}"]) {
        Ok(output) if output.success() => output.stdout.lines().map(str::to_string).collect(),
        Ok(output) => {
            debug!("docker system df failed: {}", output.stderr.trim());
            Vec::new()
        }
        Err(err) => {
            debug!("docker system df unavailable: {}", err);
            Vec::new()
        }
    };

    DockerDf { raw }
}

pub struct DockerDfTool;

impl DiagTool for DockerDfTool {
    fn name(&self) -> &str {
        "docker.df"
    }

    fn description(&self) -> &str {
        "Raw `docker system df` records"
    }

    fn call(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
        to_value(docker_df())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_df_structure() {
        let data = DockerDfTool.call(&ToolArgs::empty()).unwrap();
        let object = data.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object["raw"].is_array());
    }
}
