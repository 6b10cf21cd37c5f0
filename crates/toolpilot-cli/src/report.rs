use colored::{Color, Colorize};
use std::io::Write;
use toolpilot_agent::{AgentEvent, RunSummary, StepSink};
use toolpilot_core::TokenUsage;

/// Prints a streamed run as a numbered, human-readable transcript.
pub struct TranscriptReporter<W: Write> {
    out: W,
    step: usize,
    styled: bool,
}

impl<W: Write> TranscriptReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            step: 0,
            styled: true,
        }
    }

    /// A reporter that writes no ANSI colour codes.
    pub fn plain(out: W) -> Self {
        Self {
            out,
            step: 0,
            styled: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.styled {
            return text.to_string();
        }
        let colored = text.color(color);
        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
    }

    fn header(&mut self, title: &str) {
        self.step += 1;
        let header = self.paint(&format!("--- Step {}: {} ---", self.step, title), Color::Blue, true);
        self.line(header);
    }

    fn usage(&mut self, usage: &TokenUsage) {
        let text = format!(
            "tokens: {} in / {} out / {} total",
            usage.input_tokens,
            usage.output_tokens,
            usage.total()
        );
        let text = self.paint(&text, Color::BrightBlack, false);
        self.line(text);
    }

    fn agent_step(&mut self, text: &str, tool_calls: &[toolpilot_core::ToolUse], usage: Option<&TokenUsage>) {
        self.header("assistant");
        if !text.trim().is_empty() {
            self.line(text.trim());
        }
        for call in tool_calls {
            let name = self.paint(&call.name, Color::Yellow, true);
            self.line(format!("🔧 {}", name));
            let args = serde_json::to_string_pretty(&call.input).unwrap_or_else(|_| call.input.to_string());
            for arg_line in args.lines() {
                self.line(format!("   {}", arg_line));
            }
        }
        if let Some(usage) = usage {
            self.usage(usage);
        }
    }

    fn tool_step(&mut self, results: &[toolpilot_core::ToolResult]) {
        self.header("tools");
        for result in results {
            let (mark, color) = if result.is_error {
                ("✗", Color::Red)
            } else {
                ("✓", Color::Green)
            };
            let title = self.paint(&format!("{} {}", mark, result.name), color, true);
            self.line(title);
            self.line(result.content.trim_end());
        }
    }
}

impl<W: Write> StepSink for TranscriptReporter<W> {
    fn begin(&mut self, thread_id: &str) {
        self.step = 0;
        let title = self.paint(&format!("== thread {} ==", thread_id), Color::Cyan, true);
        self.line(title);
    }

    fn on_event(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::MessageStart { .. } => {}
            AgentEvent::AgentStep {
                text,
                tool_calls,
                usage,
            } => self.agent_step(text, tool_calls, usage.as_ref()),
            AgentEvent::ToolStep { results } => self.tool_step(results),
            AgentEvent::Progress { message } => {
                let message = self.paint(message, Color::BrightBlack, false);
                self.line(format!("  › {}", message));
            }
            AgentEvent::MessageEnd { .. } => {
                let done = self.paint("✔ run finished", Color::Green, true);
                self.line(done);
            }
            AgentEvent::Error { code, message } => {
                let failed = self.paint(&format!("✖ run failed ({})", code), Color::Red, true);
                self.line(format!("{}: {}", failed, message));
            }
        }
    }

    fn finish(&mut self, summary: &RunSummary) {
        let title = self.paint("Summary", Color::Cyan, true);
        self.line(title);
        self.line(format!(
            "  streamed steps: {} ({} assistant, {} tool)",
            summary.steps_streamed(),
            summary.agent_steps,
            summary.tool_steps
        ));
        self.line(format!(
            "  thread messages: {}, tool-calling assistant messages: {}",
            summary.message_count, summary.tool_calling_messages
        ));
        self.line(format!(
            "  tokens: {} in / {} out / {} total",
            summary.usage.input_tokens,
            summary.usage.output_tokens,
            summary.usage.total()
        ));
        if let Some(error) = &summary.error {
            self.line(format!("  error: {}", error));
        }
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolpilot_core::{ToolResult, ToolUse};

    fn render(events: &[AgentEvent]) -> String {
        let mut reporter = TranscriptReporter::plain(Vec::new());
        reporter.begin("t-1");
        for event in events {
            reporter.on_event(event);
        }
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_renders_steps_in_order() {
        let output = render(&[
            AgentEvent::message_start("t-1"),
            AgentEvent::agent_step(
                "Checking first.",
                vec![ToolUse::new("c1", "check_apax_environment", json!({}))],
                Some(TokenUsage::new(12, 3)),
            ),
            AgentEvent::progress("Checking apax environment: `apax --version`"),
            AgentEvent::tool_step(vec![ToolResult::success(
                "c1",
                "check_apax_environment",
                "✅ apax environment:\n3.4.2",
            )]),
            AgentEvent::agent_step("apax 3.4.2 is installed.", vec![], None),
            AgentEvent::message_end("t-1", "apax 3.4.2 is installed."),
        ]);

        let expected_order = [
            "== thread t-1 ==",
            "--- Step 1: assistant ---",
            "🔧 check_apax_environment",
            "tokens: 12 in / 3 out / 15 total",
            "  › Checking apax environment",
            "--- Step 2: tools ---",
            "✓ check_apax_environment",
            "--- Step 3: assistant ---",
            "✔ run finished",
        ];
        let mut cursor = 0;
        for needle in expected_order {
            let found = output[cursor..].find(needle);
            assert!(found.is_some(), "missing {:?} in:\n{}", needle, output);
            cursor += found.unwrap_or(0);
        }
        assert!(!output.contains('\u{1b}'));
    }

    #[test]
    fn test_tool_arguments_are_pretty_printed() {
        let output = render(&[AgentEvent::agent_step(
            "",
            vec![ToolUse::new(
                "c1",
                "create_ax_app_project",
                json!({"project_name": "Mixer", "workspace_dir": "."}),
            )],
            None,
        )]);

        assert!(output.contains("   {"));
        assert!(output.contains("\"project_name\": \"Mixer\""));
    }

    #[test]
    fn test_error_and_summary() {
        let mut reporter = TranscriptReporter::plain(Vec::new());
        reporter.begin("t-2");
        reporter.on_event(&AgentEvent::tool_step(vec![ToolResult::error(
            "c1",
            "compile_st_code",
            "❌ Compiling ST code failed: directory not found: x",
        )]));
        reporter.on_event(&AgentEvent::error("max_iterations", "Max iterations reached: 3"));
        reporter.finish(&RunSummary {
            thread_id: "t-2".into(),
            tool_steps: 1,
            message_count: 5,
            tool_calling_messages: 2,
            usage: TokenUsage::new(100, 20),
            error: Some("Max iterations reached: 3".into()),
            ..Default::default()
        });

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(output.contains("✗ compile_st_code"));
        assert!(output.contains("✖ run failed (max_iterations): Max iterations reached: 3"));
        assert!(output.contains("streamed steps: 1 (0 assistant, 1 tool)"));
        assert!(output.contains("tokens: 100 in / 20 out / 120 total"));
    }

    #[test]
    fn test_step_counter_resets_on_begin() {
        let mut reporter = TranscriptReporter::plain(Vec::new());
        reporter.begin("a");
        reporter.on_event(&AgentEvent::tool_step(vec![]));
        reporter.begin("b");
        reporter.on_event(&AgentEvent::tool_step(vec![]));

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(output.matches("--- Step 1: tools ---").count(), 2);
    }
}
