use super::Workspace;
use crate::error::Result;
use crate::process::{CommandSpec, FallbackExecutor};
use crate::traits::{Tool, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use toolpilot_core::{Context, ToolDefinition};

/// Probes for an installed program by running a version command, with one fallback.
pub struct CheckEnvironmentTool {
    def: ToolDefinition,
    subject: String,
    primary: CommandSpec,
    alternate: Option<CommandSpec>,
    runner: FallbackExecutor,
}

impl CheckEnvironmentTool {
    pub fn new(
        def: ToolDefinition,
        subject: impl Into<String>,
        primary: CommandSpec,
        alternate: Option<CommandSpec>,
        runner: FallbackExecutor,
    ) -> Self {
        Self {
            def,
            subject: subject.into(),
            primary,
            alternate,
            runner,
        }
    }

    pub fn python(workspace: &Workspace) -> Self {
        Self::new(
            ToolDefinition::new(
                "check_python_environment",
                "Check whether Python is installed and return its version",
            )
            .with_category("environment"),
            "Python environment",
            CommandSpec::new("python").arg("--version"),
            Some(CommandSpec::new("python3").arg("--version")),
            workspace.runner().clone(),
        )
    }

    /// `apax --version`, falling back to `apax self-update` when the installed
    /// package manager cannot report a version.
    pub fn apax(workspace: &Workspace) -> Self {
        Self::new(
            ToolDefinition::new(
                "check_apax_environment",
                "Check that the apax package manager is installed and return its version",
            )
            .with_category("environment"),
            "apax environment",
            CommandSpec::new("apax").arg("--version"),
            Some(CommandSpec::new("apax").arg("self-update")),
            workspace.runner().clone(),
        )
    }
}

#[async_trait]
impl Tool for CheckEnvironmentTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, _input: Value) -> Result<ToolOutput> {
        ctx.progress(format!("Checking {}: `{}`", self.subject, self.primary));
        let invocation = self
            .runner
            .execute(ctx, &self.primary, self.alternate.as_ref())
            .await;
        Ok(invocation.into_output(&self.subject))
    }
}
