use crate::builtin::{
    CheckEnvironmentTool, CompileStCodeTool, CreateAxAppProjectTool, EnterProjectPathTool,
    ExecutePythonScriptTool, GetCurrentDirectoryTool, InstallAxSdkTool, InstallPythonPackageTool,
    ListFilesTool, OpenHtmlFileTool, ReadProjectMetadataTool, ReadPythonScriptTool, Workspace,
    WritePythonScriptTool,
};
use crate::error::Result;
use crate::registry::ToolRegistry;
use crate::traits::Tool;
use std::fmt;
use std::sync::Arc;

/// A fixed set of built-in tools an agent can be given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Catalog {
    /// Python scripting against the workspace directory.
    Scripting,
    /// The full apax toolchain.
    Toolchain,
    /// Toolchain subset for environment checks and scaffolding.
    ToolchainProject,
    /// Toolchain subset for dependency install and compilation.
    ToolchainBuild,
}

impl Catalog {
    pub const ALL: [Catalog; 4] = [
        Catalog::Scripting,
        Catalog::Toolchain,
        Catalog::ToolchainProject,
        Catalog::ToolchainBuild,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Catalog::Scripting => "scripting",
            Catalog::Toolchain => "toolchain",
            Catalog::ToolchainProject => "toolchain_project",
            Catalog::ToolchainBuild => "toolchain_build",
        }
    }

    /// Tool names in registration order.
    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            Catalog::Scripting => &[
                "check_python_environment",
                "get_current_directory",
                "write_python_script",
                "execute_python_script",
                "list_files",
                "read_python_script",
                "install_python_package",
                "open_html_file",
            ],
            Catalog::Toolchain => &[
                "check_apax_environment",
                "get_current_directory",
                "create_ax_app_project",
                "enter_project_path",
                "install_ax_code_sdk_package",
                "compile_st_code",
                "list_files",
                "read_project_metadata",
            ],
            Catalog::ToolchainProject => &[
                "check_apax_environment",
                "get_current_directory",
                "create_ax_app_project",
            ],
            Catalog::ToolchainBuild => &[
                "enter_project_path",
                "install_ax_code_sdk_package",
                "compile_st_code",
            ],
        }
    }

    pub fn tools(&self, workspace: &Workspace) -> Vec<Arc<dyn Tool>> {
        self.tool_names()
            .iter()
            .filter_map(|name| builtin_tool(name, workspace))
            .collect()
    }

    pub fn register_into(&self, registry: &mut ToolRegistry, workspace: &Workspace) -> Result<()> {
        for tool in self.tools(workspace) {
            registry.register(tool)?;
        }
        Ok(())
    }

    pub fn build(&self, workspace: &Workspace) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        self.register_into(&mut registry, workspace)?;
        tracing::debug!(
            catalog = self.as_str(),
            tools = registry.len(),
            "Built tool catalog"
        );
        Ok(registry)
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn builtin_tool(name: &str, ws: &Workspace) -> Option<Arc<dyn Tool>> {
    let tool: Arc<dyn Tool> = match name {
        "check_python_environment" => Arc::new(CheckEnvironmentTool::python(ws)),
        "check_apax_environment" => Arc::new(CheckEnvironmentTool::apax(ws)),
        "get_current_directory" => Arc::new(GetCurrentDirectoryTool::new(ws)),
        "list_files" => Arc::new(ListFilesTool::new(ws)),
        "write_python_script" => Arc::new(WritePythonScriptTool::new(ws)),
        "execute_python_script" => Arc::new(ExecutePythonScriptTool::new(ws)),
        "read_python_script" => Arc::new(ReadPythonScriptTool::new(ws)),
        "install_python_package" => Arc::new(InstallPythonPackageTool::new(ws)),
        "open_html_file" => Arc::new(OpenHtmlFileTool::new(ws)),
        "create_ax_app_project" => Arc::new(CreateAxAppProjectTool::new(ws)),
        "enter_project_path" => Arc::new(EnterProjectPathTool::new(ws)),
        "install_ax_code_sdk_package" => Arc::new(InstallAxSdkTool::new(ws)),
        "compile_st_code" => Arc::new(CompileStCodeTool::new(ws)),
        "read_project_metadata" => Arc::new(ReadProjectMetadataTool::new(ws)),
        _ => return None,
    };
    Some(tool)
}
