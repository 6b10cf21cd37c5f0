mod apax;
mod environment;
mod python;
mod workspace;

pub use apax::{
    CompileStCodeTool, CreateAxAppProjectTool, EnterProjectPathTool, InstallAxSdkTool,
    ReadProjectMetadataTool,
};
pub use environment::CheckEnvironmentTool;
pub use python::{
    ExecutePythonScriptTool, InstallPythonPackageTool, OpenHtmlFileTool, ReadPythonScriptTool,
    WritePythonScriptTool,
};
pub use workspace::{GetCurrentDirectoryTool, ListFilesTool};

use crate::process::FallbackExecutor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toolpilot_core::Config;

/// Root directory shared by the built-in tools, plus the command runner bound to it.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
    runner: FallbackExecutor,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, command_timeout: Duration) -> Self {
        let root = root.into();
        let runner = FallbackExecutor::new(command_timeout).with_working_dir(&root);
        Self { root, runner }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.workspace_dir().into_std_path_buf(),
            Duration::from_secs(config.tools.command_timeout_secs),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a tool-supplied path against the root. Absolute paths are kept.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Runner whose commands start in the workspace root.
    pub fn runner(&self) -> &FallbackExecutor {
        &self.runner
    }
}
