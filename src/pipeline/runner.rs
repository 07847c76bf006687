use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// Named string parameters handed to an external tool.
pub type ToolParams = BTreeMap<String, String>;

/// Exit status of a finished external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ToolStatus {
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external tool with named parameters and blocks until it exits.
pub trait ToolRunner {
    fn run(&self, tool: &str, params: &ToolParams) -> Result<ToolStatus>;
}

/// Spawns tools as child processes, each parameter passed as `--name value`.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    /// Directory the tools live in; `None` resolves them through `PATH`.
    pub tool_dir: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new(tool_dir: Option<PathBuf>) -> Self {
        Self { tool_dir }
    }

    fn program(&self, tool: &str) -> PathBuf {
        match &self.tool_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    pub fn arguments(params: &ToolParams) -> Vec<String> {
        params
            .iter()
            .flat_map(|(name, value)| [format!("--{}", name), value.clone()])
            .collect()
    }
}

impl ToolRunner for CommandRunner {
    fn run(&self, tool: &str, params: &ToolParams) -> Result<ToolStatus> {
        let program = self.program(tool);
        let args = Self::arguments(params);
        info!(tool, "launching external tool");
        debug!(program = %program.display(), ?args, "tool command line");

        let status = Command::new(&program)
            .args(&args)
            .status()
            .with_context(|| format!("Failed to launch {}", program.display()))?;

        Ok(ToolStatus {
            code: status.code(),
        })
    }
}
