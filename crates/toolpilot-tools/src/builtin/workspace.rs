use super::Workspace;
use crate::error::Result;
use crate::process::Invocation;
use crate::traits::{Tool, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use toolpilot_core::{Context, ToolDefinition};

pub struct GetCurrentDirectoryTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl GetCurrentDirectoryTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new(
            "get_current_directory",
            "Get the path of the current working directory",
        )
        .with_category("workspace");
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

#[async_trait]
impl Tool for GetCurrentDirectoryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, _input: Value) -> Result<ToolOutput> {
        let root = self.workspace.root();
        let invocation = match fs::canonicalize(root).await {
            Ok(path) => Invocation::success(path.display().to_string()),
            Err(e) => Invocation::failure(format!("{}: {}", root.display(), e)),
        };
        Ok(invocation.report(ctx).into_output("Current working directory"))
    }
}

pub struct ListFilesTool {
    def: ToolDefinition,
    workspace: Workspace,
}

impl ListFilesTool {
    pub fn new(workspace: &Workspace) -> Self {
        let def = ToolDefinition::new(
            "list_files",
            "List all files and folders in the current working directory",
        )
        .with_category("workspace");
        Self {
            def,
            workspace: workspace.clone(),
        }
    }
}

async fn list_entries(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = Vec::new();
    let mut reader = fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        let kind = if entry.file_type().await?.is_dir() {
            "dir"
        } else {
            "file"
        };
        entries.push((entry.file_name().to_string_lossy().into_owned(), kind));
    }
    entries.sort();
    Ok(entries
        .into_iter()
        .map(|(name, kind)| format!("{} ({})", name, kind))
        .collect())
}

#[async_trait]
impl Tool for ListFilesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, _input: Value) -> Result<ToolOutput> {
        let root = self.workspace.root();
        ctx.progress(format!("Listing files in {}", root.display()));

        let invocation = match list_entries(root).await {
            Ok(entries) if entries.is_empty() => Invocation::success("(empty)"),
            Ok(entries) => Invocation::success(entries.join("\n")),
            Err(e) => Invocation::failure(format!("{}: {}", root.display(), e)),
        };
        Ok(invocation.report(ctx).into_output("Files in the current directory"))
    }
}
