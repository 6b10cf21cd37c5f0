use super::Workspace;
use crate::error::Result;
use crate::process::{CommandSpec, Invocation};
use crate::traits::{parse_input, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;
use toolpilot_core::{Context, ToolDefinition, ToolParameter};

const METADATA_FILE: &str = "apax.yml";

fn project_name_param() -> ToolParameter {
    ToolParameter::string().with_description("Project name; it is lowercased before use")
}

fn workspace_dir_param() -> ToolParameter {
    ToolParameter::string().with_description("Directory the project lives in")
}

fn project_path_param() -> ToolParameter {
    ToolParameter::string().with_description("Path of the AX project directory")
}

#[derive(Deserialize)]
struct ProjectLocation {
    project_name: String,
    workspace_dir: String,
}

impl ProjectLocation {
    fn name(&self) -> String {
        self.project_name.trim().to_lowercase()
    }
}

#[derive(Deserialize)]
struct ProjectPath {
    project_path: String,
}

async fn is_dir(path: &std::path::Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

fn no_directory(path: &std::path::Path) -> Invocation {
    Invocation::failure(format!("directory not found: {}", path.display()))
}

pub struct CreateAxAppProjectTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl CreateAxAppProjectTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new(
            "create_ax_app_project",
            "Create a new AX app project with `apax create app`",
        )
        .with_required_param("project_name", project_name_param())
        .with_required_param("workspace_dir", workspace_dir_param())
        .with_category("apax")
        .dangerous();
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for CreateAxAppProjectTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: ProjectLocation = parse_input(input)?;
        let dir = self.workspace.resolve(&input.workspace_dir);
        let name = input.name();
        let subject = format!("Creating AX app project {}", name);

        if !is_dir(&dir).await {
            return Ok(no_directory(&dir).report(ctx).into_output(&subject));
        }

        ctx.progress(format!("Creating AX app project {} in {}", name, dir.display()));
        let invocation = self
            .workspace
            .runner()
            .in_dir(&dir)
            .execute(
                ctx,
                &CommandSpec::new("apax").args(["create", "app", name.as_str()]),
                None,
            )
            .await;
        Ok(invocation
            .into_output(&subject)
            .with_metadata("project_path", dir.join(&name).display().to_string()))
    }
}

pub struct EnterProjectPathTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl EnterProjectPathTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new(
            "enter_project_path",
            "Resolve the directory of an AX project inside a workspace directory",
        )
        .with_required_param("project_name", project_name_param())
        .with_required_param("workspace_dir", workspace_dir_param())
        .with_category("apax");
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for EnterProjectPathTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: ProjectLocation = parse_input(input)?;
        let path: PathBuf = self
            .workspace
            .resolve(&input.workspace_dir)
            .join(input.name());

        let invocation = if is_dir(&path).await {
            Invocation::success(path.display().to_string())
        } else {
            no_directory(&path)
        };
        Ok(invocation.report(ctx).into_output("Project path"))
    }
}

/// Runs one `apax` subcommand inside an existing project directory.
async fn run_in_project(
    workspace: &Workspace,
    ctx: &Context,
    project_path: &str,
    subcommand: &str,
    subject: &str,
) -> ToolOutput {
    let path = workspace.resolve(project_path);
    if !is_dir(&path).await {
        return no_directory(&path).report(ctx).into_output(subject);
    }

    ctx.progress(format!("Running `apax {}` in {}", subcommand, path.display()));
    workspace
        .runner()
        .in_dir(&path)
        .execute(ctx, &CommandSpec::new("apax").arg(subcommand), None)
        .await
        .into_output(subject)
}

pub struct InstallAxSdkTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl InstallAxSdkTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new(
            "install_ax_code_sdk_package",
            "Install the AX code SDK dependencies of a project with `apax install`",
        )
        .with_required_param("project_path", project_path_param())
        .with_category("apax")
        .dangerous();
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for InstallAxSdkTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: ProjectPath = parse_input(input)?;
        Ok(run_in_project(
            &self.workspace,
            ctx,
            &input.project_path,
            "install",
            "Installing AX code SDK packages",
        )
        .await)
    }
}

pub struct CompileStCodeTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl CompileStCodeTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new(
            "compile_st_code",
            "Compile the Structured Text sources of a project with `apax build`",
        )
        .with_required_param("project_path", project_path_param())
        .with_category("apax");
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for CompileStCodeTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: ProjectPath = parse_input(input)?;
        Ok(run_in_project(
            &self.workspace,
            ctx,
            &input.project_path,
            "build",
            "Compiling ST code",
        )
        .await)
    }
}

pub struct ReadProjectMetadataTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl ReadProjectMetadataTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new(
            "read_project_metadata",
            "Read the apax.yml manifest of an AX project",
        )
        .with_required_param("project_path", project_path_param())
        .with_category("apax");
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for ReadProjectMetadataTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> Result<ToolOutput> {
        let input: ProjectPath = parse_input(input)?;
        let path = self.workspace.resolve(&input.project_path).join(METADATA_FILE);
        ctx.progress(format!("Reading {}", path.display()));

        let invocation = match fs::read_to_string(&path).await {
            Ok(content) => Invocation::success(content.trim_end().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Invocation::failure(format!("file not found: {}", path.display()))
            }
            Err(e) => Invocation::failure(format!("{}: {}", path.display(), e)),
        };
        Ok(invocation.report(ctx).into_output("Project manifest apax.yml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::new(dir.path(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_enter_project_path_lowercases() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("ws").join("mixer")).unwrap();
        let tool = EnterProjectPathTool::new(&workspace(&dir));

        let output = tool
            .execute(&Context::new(), json!({"project_name": "Mixer", "workspace_dir": "ws"}))
            .await
            .unwrap();

        assert!(!output.is_error);
        assert!(output.content.contains("mixer"));
    }

    #[tokio::test]
    async fn test_enter_project_path_missing() {
        let dir = TempDir::new().unwrap();
        let tool = EnterProjectPathTool::new(&workspace(&dir));

        let output = tool
            .execute(&Context::new(), json!({"project_name": "Nope", "workspace_dir": "."}))
            .await
            .unwrap();

        assert!(output.is_error);
        assert!(output.content.contains("nope"));
    }

    #[tokio::test]
    async fn test_read_metadata_is_idempotent() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("mixer")).unwrap();
        std::fs::write(
            dir.path().join("mixer").join("apax.yml"),
            "name: mixer\nversion: 0.0.1\n",
        )
        .unwrap();
        let tool = ReadProjectMetadataTool::new(&workspace(&dir));
        let ctx = Context::new();

        let first = tool.execute(&ctx, json!({"project_path": "mixer"})).await.unwrap();
        let second = tool.execute(&ctx, json!({"project_path": "mixer"})).await.unwrap();

        assert!(!first.is_error);
        assert!(first.content.contains("name: mixer"));
        assert_eq!(first.content, second.content);
    }

    #[tokio::test]
    async fn test_read_metadata_missing_names_path() {
        let dir = TempDir::new().unwrap();
        let tool = ReadProjectMetadataTool::new(&workspace(&dir));

        let output = tool
            .execute(&Context::new(), json!({"project_path": "ghost"}))
            .await
            .unwrap();

        assert!(output.is_error);
        let expected = dir.path().join("ghost").join("apax.yml");
        assert!(output.content.contains(&expected.display().to_string()));
    }

    #[tokio::test]
    async fn test_missing_metadata_reports_progress() {
        let dir = TempDir::new().unwrap();
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let ctx = Context::new().with_writer(Arc::new(move |l| sink.lock().unwrap().push(l)));

        let output = ReadProjectMetadataTool::new(&workspace(&dir))
            .execute(&ctx, json!({"project_path": "ghost"}))
            .await
            .unwrap();

        assert!(output.is_error);
        let lines = lines.lock().unwrap();
        assert!(lines
            .iter()
            .any(|l| l.starts_with("[failure]") && l.contains("apax.yml")));
    }

    #[tokio::test]
    async fn test_build_requires_existing_project() {
        let dir = TempDir::new().unwrap();
        let tool = CompileStCodeTool::new(&workspace(&dir));

        let output = tool
            .execute(&Context::new(), json!({"project_path": "missing"}))
            .await
            .unwrap();

        assert!(output.is_error);
        assert!(output.content.contains("directory not found"));
    }

    #[tokio::test]
    async fn test_create_requires_workspace_dir() {
        let dir = TempDir::new().unwrap();
        let tool = CreateAxAppProjectTool::new(&workspace(&dir));

        let output = tool
            .execute(
                &Context::new(),
                json!({"project_name": "Demo", "workspace_dir": "does-not-exist"}),
            )
            .await
            .unwrap();

        assert!(output.is_error);
        assert!(output.content.contains("does-not-exist"));
    }
}
