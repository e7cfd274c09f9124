//! CLI - reedline-based REPL interface
//!
//! Reads command lines, hands them to the command table and prints the
//! result. `help` and `quit` are handled here.

use crate::app::{dispatch, Session, COMMANDS};
use anyhow::Result;
use colored::Colorize;
use reedline::{Prompt, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal};
use std::borrow::Cow;

/// Prompt showing the memory context and the size of the capture log
pub struct CapturePrompt {
    context: String,
    captures: usize,
}

impl CapturePrompt {
    pub fn new(context: String) -> Self {
        Self {
            context,
            captures: 0,
        }
    }

    pub fn set_captures(&mut self, captures: usize) {
        self.captures = captures;
    }
}

impl Prompt for CapturePrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(format!("[{}|{} cap]", self.context, self.captures))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "(failed) ",
        };
        Cow::Owned(format!("(search: {}{}) ", prefix, history_search.term))
    }
}

/// What the REPL should do after a line
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Quit,
}

/// Print the help message
fn print_help() {
    println!("{}", "tracecap Commands".bold().cyan());
    println!("{}", "═".repeat(50).cyan());

    for spec in COMMANDS {
        println!("  {:<40} {}", spec.synopsis().green(), spec.help);
    }

    println!("\n{}", "Other:".bold().yellow());
    println!("  {:<40} Show this help", "?".green());
    println!("  {:<40} Quit", "q".green());
}

/// Execute one input line, printing output or the error
pub fn run_line(session: &mut Session, input: &str) -> LineOutcome {
    match input.trim() {
        "" => return LineOutcome::Continue,
        "?" | "help" => {
            print_help();
            return LineOutcome::Continue;
        }
        "q" | "quit" | "exit" => return LineOutcome::Quit,
        _ => {}
    }

    match dispatch(session, input) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            log::debug!("Command failed: {:?}", e);
            println!("{} {}", "[!]".red(), e);
        }
    }
    LineOutcome::Continue
}

/// Run the CLI REPL
pub fn run_cli(session: &mut Session) -> Result<()> {
    let mut line_editor = Reedline::create();
    let mut prompt = CapturePrompt::new(session.context().describe());

    println!(
        "{}",
        format!(
            "tracecap - capturing to {} - type '?' for help, 'q' to quit",
            session.store().path().display()
        )
        .cyan()
    );

    loop {
        prompt.set_captures(session.capture_count());
        let sig = line_editor.read_line(&prompt)?;
        match sig {
            Signal::Success(buffer) => {
                if run_line(session, &buffer) == LineOutcome::Quit {
                    println!("[*] Shutting down...");
                    break;
                }
            }
            Signal::CtrlD | Signal::CtrlC => {
                println!("\n[*] Interrupted");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureStore;
    use crate::core::ImageMemory;
    use tempfile::tempdir;

    #[test]
    fn test_builtins() {
        let dir = tempdir().expect("tempdir");
        let mut session = Session::new(
            Box::new(ImageMemory::empty()),
            CaptureStore::new(dir.path().join("c.json")),
        );
        assert_eq!(run_line(&mut session, "   "), LineOutcome::Continue);
        assert_eq!(run_line(&mut session, "help"), LineOutcome::Continue);
        assert_eq!(run_line(&mut session, "bogus"), LineOutcome::Continue);
        assert_eq!(run_line(&mut session, "capval 7"), LineOutcome::Continue);
        assert_eq!(run_line(&mut session, " quit "), LineOutcome::Quit);
        assert_eq!(session.capture_count(), 1);
    }

    #[test]
    fn test_line_reaches_dispatch_untrimmed() {
        let dir = tempdir().expect("tempdir");
        let mut session = Session::new(
            Box::new(ImageMemory::new(0, b"abcd".to_vec())),
            CaptureStore::new(dir.path().join("c.json")),
        );
        run_line(&mut session, "capmem 0 4 \"note ");
        match &session.store().records().unwrap()[0] {
            crate::capture::CaptureRecord::Mem(mem) => {
                assert_eq!(mem.comment.as_deref(), Some("note "))
            }
            other => panic!("expected mem record, got {:?}", other),
        }
    }

    #[test]
    fn test_prompt_render() {
        let mut prompt = CapturePrompt::new("pid:42".into());
        prompt.set_captures(3);
        assert_eq!(prompt.render_prompt_left(), "[pid:42|3 cap]");
    }
}
