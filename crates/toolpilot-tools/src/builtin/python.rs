use super::Workspace;
use crate::error::Result;
use crate::process::{CommandSpec, Invocation, Status};
use crate::traits::{parse_input, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use toolpilot_core::{Context, ToolDefinition, ToolParameter};

const DEFAULT_SCRIPT: &str = "script.py";
const DEFAULT_HTML: &str = "output.html";

fn filename_param(default: &str, what: &str) -> ToolParameter {
    ToolParameter::string()
        .with_description(format!("{} file name, defaults to {}", what, default))
        .with_default(Value::String(default.to_string()))
}

#[derive(Deserialize)]
struct FileInput {
    #[serde(default)]
    filename: Option<String>,
}

impl FileInput {
    fn resolve(&self, workspace: &Workspace, default: &str) -> PathBuf {
        let name = self
            .filename
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(default);
        workspace.resolve(name)
    }
}

fn missing(path: &Path) -> Invocation {
    Invocation::failure(format!("file not found: {}", path.display()))
}

pub struct WritePythonScriptTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl WritePythonScriptTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new("write_python_script", "Write Python code to a file")
            .with_required_param(
                "script_content",
                ToolParameter::string().with_description("Python source to write"),
            )
            .with_param("filename", filename_param(DEFAULT_SCRIPT, "Target"))
            .with_category("python")
            .dangerous();
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[derive(Deserialize)]
struct WriteScriptInput {
    script_content: String,
    #[serde(flatten)]
    file: FileInput,
}

#[async_trait]
impl Tool for WritePythonScriptTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: WriteScriptInput = parse_input(input)?;
        let path = input.file.resolve(&self.workspace, DEFAULT_SCRIPT);
        ctx.progress(format!("Writing Python script {}", path.display()));

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                let failed = Invocation::failure(format!("{}: {}", parent.display(), e));
                return Ok(failed.report(ctx).into_output("Writing the script"));
            }
        }

        let invocation = match fs::write(&path, &input.script_content).await {
            Ok(()) => Invocation::success(format!(
                "wrote {} bytes to {}",
                input.script_content.len(),
                path.display()
            )),
            Err(e) => Invocation::failure(format!("{}: {}", path.display(), e)),
        };
        Ok(invocation
            .report(ctx)
            .into_output("Writing the script")
            .with_metadata("path", path.display().to_string()))
    }
}

pub struct ExecutePythonScriptTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl ExecutePythonScriptTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new("execute_python_script", "Run a Python script file")
            .with_param("filename", filename_param(DEFAULT_SCRIPT, "Script"))
            .with_category("python")
            .dangerous();
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for ExecutePythonScriptTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: FileInput = parse_input(input)?;
        let path = input.resolve(&self.workspace, DEFAULT_SCRIPT);

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(missing(&path).report(ctx).into_output("Running the script"));
        }

        ctx.progress(format!("Running Python script {}", path.display()));
        let file = path.display().to_string();
        let invocation = self
            .workspace
            .runner()
            .execute(
                ctx,
                &CommandSpec::new("python").arg(&file),
                Some(&CommandSpec::new("python3").arg(&file)),
            )
            .await;
        Ok(invocation.into_output("Running the script"))
    }
}

pub struct ReadPythonScriptTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl ReadPythonScriptTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new("read_python_script", "Read the contents of a Python script")
            .with_param("filename", filename_param(DEFAULT_SCRIPT, "Script"))
            .with_category("python");
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for ReadPythonScriptTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: FileInput = parse_input(input)?;
        let path = input.resolve(&self.workspace, DEFAULT_SCRIPT);
        let subject = format!("Contents of {}", path.display());
        ctx.progress(format!("Reading {}", path.display()));

        let invocation = match fs::read_to_string(&path).await {
            Ok(content) => Invocation::success(format!("```python\n{}\n```", content.trim_end())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => missing(&path),
            Err(e) => Invocation::failure(format!("{}: {}", path.display(), e)),
        };
        Ok(invocation.report(ctx).into_output(&subject))
    }
}

pub struct InstallPythonPackageTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl InstallPythonPackageTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new("install_python_package", "Install a Python package with pip")
            .with_required_param(
                "package_name",
                ToolParameter::string().with_description("Name of the package to install"),
            )
            .with_param(
                "version",
                ToolParameter::string().with_description("Exact version to pin, optional"),
            )
            .with_category("python")
            .dangerous();
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[derive(Deserialize)]
struct InstallInput {
    package_name: String,
    #[serde(default)]
    version: Option<String>,
}

impl InstallInput {
    fn requirement(&self) -> String {
        match self.version.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => format!("{}=={}", self.package_name.trim(), version),
            None => self.package_name.trim().to_string(),
        }
    }
}

#[async_trait]
impl Tool for InstallPythonPackageTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: InstallInput = parse_input(input)?;
        let requirement = input.requirement();
        ctx.progress(format!("Installing Python package {}", requirement));

        let invocation = self
            .workspace
            .runner()
            .execute(
                ctx,
                &CommandSpec::new("pip").args(["install", requirement.as_str()]),
                Some(&CommandSpec::new("pip3").args(["install", requirement.as_str()])),
            )
            .await;
        Ok(invocation.into_output(&format!("Installing {}", requirement)))
    }
}

pub struct OpenHtmlFileTool {
    def: ToolDefinition,
    workspace: Workspace,
    opener: Option<(CommandSpec, Option<CommandSpec>)>,
}

impl OpenHtmlFileTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new("open_html_file", "Open an HTML file in the default browser")
            .with_param("filename", filename_param(DEFAULT_HTML, "HTML"))
            .with_category("python");
        Self {
            def,
            workspace: workspace.clone(),
            opener: None,
        }
    }

    /// Replaces the platform opener. The file path is appended to both commands.
    pub fn with_opener(mut self, primary: CommandSpec, alternate: Option<CommandSpec>) -> Self {
        self.opener = Some((primary, alternate));
        self
    }

    fn commands(&self, path: &str) -> (CommandSpec, Option<CommandSpec>) {
        match &self.opener {
            Some((primary, alternate)) => (
                primary.clone().arg(path),
                alternate.clone().map(|alt| alt.arg(path)),
            ),
            None => opener_commands(path),
        }
    }
}

/// Platform opener for a file, plus the secondary opener tried on Windows.
fn opener_commands(path: &str) -> (CommandSpec, Option<CommandSpec>) {
    if cfg!(target_os = "windows") {
        let script = format!("Start-Process '{}'", path.replace('\'', "''"));
        (
            CommandSpec::new("powershell").args(["-NoProfile", "-Command", script.as_str()]),
            Some(CommandSpec::new("cmd").args(["/C", "start", "", path])),
        )
    } else if cfg!(target_os = "macos") {
        (CommandSpec::new("open").arg(path), None)
    } else {
        (CommandSpec::new("xdg-open").arg(path), None)
    }
}

#[async_trait]
impl Tool for OpenHtmlFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: FileInput = parse_input(input)?;
        let path = input.resolve(&self.workspace, DEFAULT_HTML);
        let subject = "Opening the HTML file";

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(missing(&path).report(ctx).into_output(subject));
        }

        ctx.progress(format!("Opening {}", path.display()));
        let file = path.display().to_string();
        let (primary, alternate) = self.commands(&file);
        let opened = self
            .workspace
            .runner()
            .execute(ctx, &primary, alternate.as_ref())
            .await;

        let invocation = if opened.is_failure() {
            let mut warned = Invocation::warning(format!(
                "could not open the file automatically, please open it manually: {}",
                file
            ));
            warned.stderr = Some(opened.message);
            warned.report(ctx)
        } else {
            // Keep status, stderr and fallback; only the message is rewritten.
            let mut kept = opened;
            let done = format!("opened {} in the browser", file);
            kept.message = match (kept.status, kept.stderr.as_deref()) {
                (Status::Warning, Some(stderr)) => format!("{}; the opener reported:\n{}", done, stderr),
                _ => done,
            };
            kept
        };
        Ok(invocation.into_output(subject))
    }
}
