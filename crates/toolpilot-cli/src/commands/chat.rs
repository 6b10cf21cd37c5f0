use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io;
use toolpilot_agent::{RunConfig, SessionDriver, StreamMode};
use toolpilot_core::{Config, Id, Message, Profile};

use super::create_agent;
use crate::report::TranscriptReporter;

/// Interactive chat; every turn runs on the same thread so the agent remembers earlier turns.
pub async fn run(
    config: &Config,
    profile: Profile,
    system: Option<&str>,
    thread: Option<String>,
) -> anyhow::Result<()> {
    let agent = create_agent(config, profile, system)?;
    let thread_id = thread.unwrap_or_else(|| Id::thread_key("cli"));
    let mut driver = SessionDriver::new(agent);

    println!("{}", "toolpilot".green().bold());
    println!("profile {}, thread {}", profile.to_string().cyan(), thread_id.cyan());
    println!("Type {} to exit\n", "quit".yellow());

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(&format!("{} ", "You:".cyan().bold()));

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" || line == "exit" {
                    println!("{}", "Goodbye!".green());
                    break;
                }

                rl.add_history_entry(line)?;

                let run = RunConfig::new(&thread_id).with_mode(StreamMode::Updates);
                let mut reporter = TranscriptReporter::new(io::stdout());
                let summary = driver
                    .drive(vec![Message::user(line)], run, &mut reporter)
                    .await;

                if let Some(text) = summary.final_text.filter(|_| summary.error.is_none()) {
                    println!("{} {}\n", "Assistant:".magenta().bold(), text);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                println!("{} {:?}", "Error:".red().bold(), err);
                break;
            }
        }
    }

    Ok(())
}
