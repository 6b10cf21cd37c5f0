use colored::Colorize;
use std::io;
use toolpilot_agent::{RunConfig, SessionDriver, StreamMode};
use toolpilot_core::{Config, Id, Profile};

use super::{cancel_on_ctrl_c, create_agent};
use crate::report::TranscriptReporter;

pub struct RunArgs {
    pub message: String,
    pub profile: Profile,
    pub system: Option<String>,
    pub thread: Option<String>,
    pub mode: StreamMode,
    pub recursion_limit: Option<usize>,
}

pub async fn run(config: &Config, args: RunArgs) -> anyhow::Result<()> {
    let agent = create_agent(config, args.profile, args.system.as_deref())?;
    let thread_id = args.thread.unwrap_or_else(|| Id::thread_key("cli"));

    let mut run = RunConfig::new(thread_id)
        .with_mode(args.mode)
        .with_cancellation(cancel_on_ctrl_c());
    if let Some(limit) = args.recursion_limit {
        run = run.with_recursion_limit(limit);
    }

    let mut driver = SessionDriver::new(agent);
    let mut reporter = TranscriptReporter::new(io::stdout());
    let summary = driver
        .drive(SessionDriver::initial_messages(None, &args.message), run, &mut reporter)
        .await;

    if let Some(error) = summary.error {
        eprintln!("{} {}", "Error:".red().bold(), error);
        std::process::exit(1);
    }

    Ok(())
}
