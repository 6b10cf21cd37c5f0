use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolpilot_agent::StreamMode;
use toolpilot_core::{Config, Profile};

mod commands;
mod report;

use commands::{run::RunArgs, Overrides};

#[derive(Parser)]
#[command(name = "toolpilot")]
#[command(author, version, about = "Tool-calling LLM agent for scripting and AX toolchain tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "TOOLPILOT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Directory the tools operate in
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one task through the agent and print the streamed transcript
    Run {
        /// The task to send
        message: String,
        /// Tool set and default prompt: scripting, toolchain or delegated
        #[arg(short, long)]
        profile: Option<Profile>,
        /// System prompt replacing the profile default
        #[arg(short, long)]
        system: Option<String>,
        /// Thread id; reuse one to continue a conversation
        #[arg(short, long)]
        thread: Option<String>,
        /// Stream mode: updates or custom
        #[arg(long, default_value = "updates")]
        mode: StreamMode,
        #[arg(long)]
        recursion_limit: Option<usize>,
    },
    /// Start an interactive chat on a single thread
    Chat {
        #[arg(short, long)]
        profile: Option<Profile>,
        #[arg(short, long)]
        system: Option<String>,
        #[arg(short, long)]
        thread: Option<String>,
    },
    /// Ask a single question without tools or memory
    Ask {
        question: String,
        #[arg(short, long)]
        system: Option<String>,
    },
    /// List the tools of one or all profiles
    Tools {
        #[arg(short, long)]
        profile: Option<Profile>,
    },
}

fn init_tracing(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(&Overrides {
        config: cli.config,
        api_key: cli.api_key,
        base_url: cli.base_url,
        model: cli.model,
        workspace: cli.workspace,
    })?;
    init_tracing(cli.verbose, &config);

    let default_profile = config.agent.profile;

    match cli.command {
        Commands::Run {
            message,
            profile,
            system,
            thread,
            mode,
            recursion_limit,
        } => {
            let args = RunArgs {
                message,
                profile: profile.unwrap_or(default_profile),
                system,
                thread,
                mode,
                recursion_limit,
            };
            commands::run::run(&config, args).await?;
        }
        Commands::Chat {
            profile,
            system,
            thread,
        } => {
            let profile = profile.unwrap_or(default_profile);
            commands::chat::run(&config, profile, system.as_deref(), thread).await?;
        }
        Commands::Ask { question, system } => {
            commands::ask::run(&config, &question, system.as_deref()).await?;
        }
        Commands::Tools { profile } => {
            commands::tools::run(&config, profile)?;
        }
    }

    Ok(())
}
