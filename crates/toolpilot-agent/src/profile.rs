//! Ready-made agents for each [`Profile`]: the tools they get and their default prompt.

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::delegate::DelegateTool;
use crate::error::Result;
use std::sync::Arc;
use toolpilot_core::{Config, Profile};
use toolpilot_llm::LlmProvider;
use toolpilot_tools::{Catalog, ToolRegistry, Workspace};
use tracing::debug;

pub const SCRIPTING_PROMPT: &str = "\
You are a Python data analysis assistant. Work step by step and show your reasoning.

Always follow this order and never skip the first step:
1. Check the Python environment.
2. Get the current working directory.
3. Install the packages your script needs.
4. Write the analysis script.
5. Run the script and report its results.
6. Optionally open the generated HTML file to show the result.

If something fails, analyse the cause and propose a fix. When the task is finished, say so explicitly.";

pub const TOOLCHAIN_PROMPT: &str = "\
You are a SIMATIC AX engineer. Work step by step and show your reasoning.

Always follow this order; steps marked optional may be skipped:
1. (required) Check the AX code environment and make sure the apax package manager is installed.
2. (optional) Get the current working directory.
3. (optional) Create a template project when the user asks for one.
4. (optional) Install the AX code SDK packages, passing the full project path.
5. (optional) Compile the project, passing the full project path.

Install and compile always take the full project path, for example {\"project_path\": \"<workspace>/<project name>\"}.
If something fails, analyse the cause and propose a fix. When the task is finished, say so explicitly.";

pub const COORDINATOR_PROMPT: &str = "\
You are an assistant for SIMATIC AX development. You help with AX environment checks,
project creation, SDK installation and compiling ST code, and you answer AX questions.

You have two sub-agents:
- ax_project_agent: checks the AX environment, gets the working directory, creates AX projects.
- ax_build_agent: enters a project path, installs AX SDK packages, compiles ST code.

Only call a sub-agent when the user needs an operation on an AX project. Answer general
questions directly. Tools support the conversation; they are not required on every turn.";

pub const PROJECT_AGENT_PROMPT: &str = "\
You manage SIMATIC AX projects: check the apax environment, report the working directory
and create app projects. Reply with a short summary of what you did and the resulting paths.";

pub const BUILD_AGENT_PROMPT: &str = "\
You build SIMATIC AX projects: resolve the project path first, then install SDK packages
and compile ST code as asked. Reply with a short summary including any compiler errors.";

pub fn default_prompt(profile: Profile) -> &'static str {
    match profile {
        Profile::Scripting => SCRIPTING_PROMPT,
        Profile::Toolchain => TOOLCHAIN_PROMPT,
        Profile::Delegated => COORDINATOR_PROMPT,
    }
}

fn agent_with(
    config: AgentConfig,
    llm: Arc<dyn LlmProvider>,
    registry: ToolRegistry,
) -> Result<Agent> {
    Agent::builder()
        .config(config)
        .llm(llm)
        .tool_registry(Arc::new(registry))
        .build()
}

fn sub_agent(
    config: &Config,
    name: &str,
    prompt: &str,
    catalog: Catalog,
    llm: Arc<dyn LlmProvider>,
    workspace: &Workspace,
) -> Result<Agent> {
    let agent_config = AgentConfig::from_config(config, prompt).with_name(name);
    agent_with(agent_config, llm, catalog.build(workspace)?)
}

/// Tool registry for `profile`. The delegated profile gets one delegate tool per sub-agent.
pub fn registry_for(
    profile: Profile,
    config: &Config,
    llm: Arc<dyn LlmProvider>,
    workspace: &Workspace,
) -> Result<ToolRegistry> {
    let registry = match profile {
        Profile::Scripting => Catalog::Scripting.build(workspace)?,
        Profile::Toolchain => Catalog::Toolchain.build(workspace)?,
        Profile::Delegated => {
            let project = sub_agent(
                config,
                "ax_project_agent",
                PROJECT_AGENT_PROMPT,
                Catalog::ToolchainProject,
                llm.clone(),
                workspace,
            )?;
            let build = sub_agent(
                config,
                "ax_build_agent",
                BUILD_AGENT_PROMPT,
                Catalog::ToolchainBuild,
                llm,
                workspace,
            )?;

            ToolRegistry::new()
                .with(DelegateTool::new(
                    "ax_project_agent",
                    "AX project sub-agent: checks the AX environment, gets the working directory, creates AX projects",
                    project,
                ))?
                .with(DelegateTool::new(
                    "ax_build_agent",
                    "AX build sub-agent: enters a project path, installs AX SDK packages, compiles ST code",
                    build,
                ))?
        }
    };
    debug!(profile = %profile, tools = registry.len(), "Built profile registry");
    Ok(registry)
}

/// Agent for `profile`, with `prompt` or the profile's default prompt.
pub fn build_agent(
    profile: Profile,
    config: &Config,
    llm: Arc<dyn LlmProvider>,
    workspace: &Workspace,
    prompt: Option<&str>,
) -> Result<Agent> {
    let registry = registry_for(profile, config, llm.clone(), workspace)?;
    let prompt = prompt.unwrap_or_else(|| default_prompt(profile));
    let agent_config = AgentConfig::from_config(config, prompt).with_name(profile.as_str());
    agent_with(agent_config, llm, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunConfig;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use toolpilot_core::Message;
    use toolpilot_llm::ScriptedProvider;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::new(dir.path(), Duration::from_secs(5))
    }

    #[test]
    fn test_profile_registries() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        let config = Config::default();
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new());

        let scripting = registry_for(Profile::Scripting, &config, llm.clone(), &ws).unwrap();
        assert!(scripting.contains("write_python_script"));

        let toolchain = registry_for(Profile::Toolchain, &config, llm.clone(), &ws).unwrap();
        assert!(toolchain.contains("compile_st_code"));

        let delegated = registry_for(Profile::Delegated, &config, llm, &ws).unwrap();
        assert_eq!(delegated.list(), vec!["ax_build_agent", "ax_project_agent"]);
    }

    #[test]
    fn test_build_agent_uses_default_prompt() {
        let dir = TempDir::new().unwrap();
        let agent = build_agent(
            Profile::Toolchain,
            &Config::default(),
            Arc::new(ScriptedProvider::new()),
            &workspace(&dir),
            None,
        )
        .unwrap();

        assert_eq!(agent.config().system_prompt, TOOLCHAIN_PROMPT);
        assert_eq!(agent.config().name, "toolchain");
        assert_eq!(agent.config().model, Config::default().llm.model);
    }

    #[tokio::test]
    async fn test_delegated_profile_reaches_build_tools() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("mixer")).unwrap();

        // One provider serves both the coordinator and the sub-agents, in call order.
        let llm = Arc::new(
            ScriptedProvider::new()
                .reply_tool_call("c1", "ax_build_agent", json!({"query": "enter project mixer"}))
                .reply_tool_call(
                    "c2",
                    "enter_project_path",
                    json!({"project_name": "Mixer", "workspace_dir": "."}),
                )
                .reply_text("The project is at mixer.")
                .reply_text("Your project directory exists."),
        );
        let agent = build_agent(
            Profile::Delegated,
            &Config::default(),
            llm.clone(),
            &workspace(&dir),
            None,
        )
        .unwrap();

        let response = agent
            .invoke(vec![Message::user("Where is my project?")], RunConfig::new("main"))
            .await
            .unwrap();

        assert_eq!(response.text, "Your project directory exists.");
        assert_eq!(response.tool_calls[0].output, "The project is at mixer.");
        assert_eq!(llm.request_count(), 4);
        let requests = llm.requests();
        assert!(requests[1].tool_names().contains(&"enter_project_path"));
        assert!(!requests[1].tool_names().contains(&"create_ax_app_project"));
    }
}
