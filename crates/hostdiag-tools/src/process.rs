//! Top processes by memory and CPU: `proc.top`

use hostdiag_json_rpc::{DiagTool, ToolArgs, ToolError};
use serde::Serialize;
use serde_json::Value;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::fs::to_value;

pub const DEFAULT_LIMIT: u64 = 25;
const MAX_CMD_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcInfo {
    pub pid: u32,
    pub name: String,
    pub mem_pct: f64,
    pub cpu_pct: f64,
    pub cmd: String,
}

/// Snapshot of running processes, heaviest memory users first.
///
/// CPU usage is measured since the previous refresh of a process; a single
/// snapshot therefore reports 0 for processes first seen in this call.
pub fn top_procs(limit: usize) -> Vec<ProcInfo> {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing()
            .with_memory()
            .with_cpu()
            .with_cmd(UpdateKind::OnlyIfNotSet),
    );

    let total_memory = system.total_memory();
    let mut procs: Vec<ProcInfo> = system
        .processes()
        .iter()
        .map(|(pid, process)| {
            let mem_pct = if total_memory == 0 {
                0.0
            } else {
                process.memory() as f64 / total_memory as f64 * 100.0
            };
            let cmd = process
                .cmd()
                .iter()
                .map(|part| part.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            ProcInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                mem_pct: round2(mem_pct),
                cpu_pct: round2(f64::from(process.cpu_usage())),
                cmd: truncate_chars(&cmd, MAX_CMD_CHARS),
            }
        })
        .collect();

    sort_heaviest_first(&mut procs);
    procs.truncate(limit);
    procs
}

fn sort_heaviest_first(procs: &mut [ProcInfo]) {
    procs.sort_by(|a, b| {
        b.mem_pct
            .total_cmp(&a.mem_pct)
            .then_with(|| b.cpu_pct.total_cmp(&a.cpu_pct))
    });
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

pub struct TopProcessesTool;

impl DiagTool for TopProcessesTool {
    fn name(&self) -> &str {
        "proc.top"
    }

    fn description(&self) -> &str {
        "Processes sorted by memory then CPU (limit)"
    }

    fn call(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let limit = args.u64_or("limit", DEFAULT_LIMIT)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        to_value(top_procs(limit))
    }
}
