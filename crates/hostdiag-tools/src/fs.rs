//! Filesystem tools: `fs.du` and `fs.bigfiles`

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use hostdiag_json_rpc::{DiagTool, ToolArgs, ToolError};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::command;

pub const DEFAULT_DU_DEPTH: u64 = 2;
pub const DEFAULT_MIN_SIZE: &str = "+200M";
pub const DEFAULT_BIGFILES_LIMIT: u64 = 200;

/// One `du` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuEntry {
    pub path: String,
    pub kb: u64,
}

/// One large file, size rendered the way `ls -h` does
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BigFile {
    pub path: String,
    pub size: String,
}

/// Disk usage in kilobytes for `path`, down to `depth` levels.
///
/// BSD `du` takes `-d`, older GNU only `--max-depth`; the second form is
/// tried when the first yields nothing. A non-zero exit with parsed rows is
/// accepted: du keeps going past unreadable directories.
pub fn du_k(path: &Path, depth: u64) -> Result<Vec<DuEntry>, ToolError> {
    ensure_operand(path)?;
    let mut last_error = None;

    for depth_flag in ["-d", "--max-depth"] {
        let args: Vec<OsString> = vec![
            "-k".into(),
            depth_flag.into(),
            depth.to_string().into(),
            "--".into(),
            path.as_os_str().to_owned(),
        ];

        let output = command::run("du", &args)?;
        let rows = parse_du(&output.stdout);
        if !rows.is_empty() {
            if !output.success() {
                debug!("du exited with {} after {} rows", output.status, rows.len());
            }
            return Ok(rows);
        }

        last_error = Some(if output.success() {
            ToolError::Failed(format!("du produced no output for {}", path.display()))
        } else {
            output.into_error()
        });
    }

    Err(last_error.unwrap_or_else(|| ToolError::Failed("du produced no output".to_string())))
}

fn parse_du(stdout: &str) -> Vec<DuEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let (kb, path) = line.split_once('\t')?;
            Some(DuEntry {
                path: path.to_string(),
                kb: kb.trim().parse().ok()?,
            })
        })
        .collect()
}

fn min_size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?[0-9]+[bcwkMG]?$").expect("min_size pattern is valid"))
}

/// Largest regular files below `path` matching find's `-size <min_size>`,
/// largest first, at most `limit` entries
pub fn bigfiles(path: &Path, min_size: &str, limit: usize) -> Result<Vec<BigFile>, ToolError> {
    ensure_operand(path)?;
    if !min_size_pattern().is_match(min_size) {
        return Err(ToolError::invalid_argument(
            "min_size",
            format!("expected find -size syntax such as +200M, got {:?}", min_size),
        ));
    }

    let args: Vec<OsString> = vec![
        path.as_os_str().to_owned(),
        "-type".into(),
        "f".into(),
        "-size".into(),
        min_size.into(),
        "-print0".into(),
    ];
    let output = command::run("find", &args)?;
    if !output.success() && output.stdout_bytes.is_empty() {
        return Err(output.into_error());
    }

    let mut files: Vec<(u64, PathBuf)> = output
        .stdout_bytes
        .split(|byte| *byte == 0)
        .filter(|candidate| !candidate.is_empty())
        .filter_map(|candidate| {
            let candidate = path_from_bytes(candidate);
            match std::fs::metadata(&candidate) {
                Ok(meta) => Some((meta.len(), candidate)),
                Err(err) => {
                    debug!("Skipping {}: {}", candidate.display(), err);
                    None
                }
            }
        })
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    files.truncate(limit);

    Ok(files
        .into_iter()
        .map(|(len, candidate)| BigFile {
            path: candidate.to_string_lossy().into_owned(),
            size: human_size(len),
        })
        .collect())
}

/// Refuse operands the utilities would parse as options
fn ensure_operand(path: &Path) -> Result<(), ToolError> {
    if path.as_os_str().as_encoded_bytes().first() == Some(&b'-') {
        return Err(ToolError::invalid_argument(
            "path",
            format!("path must not start with '-', got {:?}", path),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Render a byte count like `ls -h`: plain bytes below 1K, one rounded-up
/// decimal below 10 units, whole rounded-up units otherwise
pub fn human_size(bytes: u64) -> String {
    const UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < 1024 {
        return bytes.to_string();
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if value < 10.0 {
        let rounded = (value * 10.0).ceil() / 10.0;
        if rounded < 10.0 {
            return format!("{:.1}{}", rounded, UNITS[unit]);
        }
        return format!("{:.0}{}", rounded, UNITS[unit]);
    }

    let rounded = value.ceil();
    if rounded >= 1024.0 && unit < UNITS.len() - 1 {
        return format!("1.0{}", UNITS[unit + 1]);
    }
    format!("{:.0}{}", rounded, UNITS[unit])
}

pub struct DiskUsageTool;

impl DiagTool for DiskUsageTool {
    fn name(&self) -> &str {
        "fs.du"
    }

    fn description(&self) -> &str {
        "Disk usage in KiB per directory (path, depth)"
    }

    fn call(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let path = args.path_or_home("path")?;
        let depth = args.u64_or("depth", DEFAULT_DU_DEPTH)?;
        to_value(du_k(&path, depth)?)
    }
}

pub struct BigFilesTool;

impl DiagTool for BigFilesTool {
    fn name(&self) -> &str {
        "fs.bigfiles"
    }

    fn description(&self) -> &str {
        "Largest files below a path (path, min_size, limit)"
    }

    fn call(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let path = args.path_or_home("path")?;
        let min_size = args.str_or("min_size", DEFAULT_MIN_SIZE)?;
        let limit = args.u64_or("limit", DEFAULT_BIGFILES_LIMIT)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        to_value(bigfiles(&path, &min_size, limit)?)
    }
}

pub(crate) fn to_value<T: Serialize>(data: T) -> Result<Value, ToolError> {
    serde_json::to_value(data).map_err(|err| ToolError::Failed(format!("serialization failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        ToolArgs::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_parse_du_skips_garbage() {
        let rows = parse_du("12\t/tmp/a\nnot a row\n4\t/tmp/with\ttab\nx\t/tmp/b\n");
        assert_eq!(
            rows,
            vec![
                DuEntry { path: "/tmp/a".into(), kb: 12 },
                DuEntry { path: "/tmp/with\ttab".into(), kb: 4 },
            ]
        );
    }

    #[test]
    fn test_du_k_basic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file.txt"), "hello").unwrap();

        let rows = du_k(dir.path(), 0).unwrap();
        let root = dir.path().to_string_lossy();
        assert!(rows.iter().any(|row| row.path == root));
    }

    #[test]
    fn test_du_missing_path_fails() {
        let err = du_k(Path::new("/hostdiag/definitely/missing"), 1).unwrap_err();
        assert!(matches!(err, ToolError::CommandFailed { .. }));
    }

    #[test]
    fn test_du_tool_via_args() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let data = DiskUsageTool
            .call(&args(json!({"path": dir.path().to_string_lossy(), "depth": 1})))
            .unwrap();
        let rows = data.as_array().unwrap();
        assert!(rows.len() >= 2);
        assert!(rows.iter().all(|row| row["kb"].is_u64() && row["path"].is_string()));
    }

    #[test]
    fn test_bigfiles_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(10)).unwrap();
        std::fs::write(dir.path().join("bigger.txt"), "x".repeat(2048)).unwrap();

        let items = bigfiles(dir.path(), "+0c", 10).unwrap();
        let names: Vec<String> = items
            .iter()
            .map(|item| {
                Path::new(&item.path)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["bigger.txt", "big.txt"]);
        assert_eq!(items[0].size, "2.0K");
        assert_eq!(items[1].size, "10");
    }

    #[test]
    fn test_bigfiles_limit() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("f{i}")), "x".repeat(i + 1)).unwrap();
        }
        assert_eq!(bigfiles(dir.path(), "+0c", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_bigfiles_rejects_bad_min_size() {
        let tool = BigFilesTool;
        let err = tool
            .call(&args(json!({"path": "/tmp", "min_size": "-delete"})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref name, .. } if name == "min_size"));
    }

    #[test]
    fn test_option_like_path_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let victim = dir.path().join("victim.txt");
        std::fs::write(&victim, "keep me").unwrap();

        // refused before find is spawned
        let err = BigFilesTool
            .call(&args(json!({"path": "-delete", "min_size": "+0c"})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref name, .. } if name == "path"));

        let err = bigfiles(Path::new("-delete"), "+0c", 10).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
        assert!(victim.exists());

        let err = DiskUsageTool
            .call(&args(json!({"path": "--files0-from=/etc/passwd"})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref name, .. } if name == "path"));
        assert!(matches!(
            du_k(Path::new("--files0-from=/etc/passwd"), 1),
            Err(ToolError::InvalidArgument { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_bigfiles_keeps_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let name = std::ffi::OsStr::from_bytes(b"caf\xe9.bin");
        std::fs::write(dir.path().join(name), "x".repeat(64)).unwrap();

        let items = bigfiles(dir.path(), "+0c", 10).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].path.ends_with("caf\u{fffd}.bin"));
        assert_eq!(items[0].size, "64");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0");
        assert_eq!(human_size(512), "512");
        assert_eq!(human_size(1024), "1.0K");
        assert_eq!(human_size(1536), "1.5K");
        assert_eq!(human_size(10 * 1024), "10K");
        assert_eq!(human_size(200 * 1024 * 1024), "200M");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024 / 2), "1.5G");
    }
}
