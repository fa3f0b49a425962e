//! Terminal implementations of the workspace collaborators

use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};

use snipql_core::{Clipboard, Confirm, Notifier, Result, Severity, SnipqlError, TracingNotifier};
use snipql_store::MergeMode;

/// Prints notifications to stderr and forwards them to the log
#[derive(Default)]
pub struct TerminalNotifier {
    log: TracingNotifier,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        eprintln!("{}", format_notification(severity, message));
        self.log.notify(severity, message);
    }
}

fn format_notification(severity: Severity, message: &str) -> String {
    match severity {
        Severity::Success | Severity::Info => message.to_string(),
        Severity::Warning | Severity::Error => format!("{severity}: {message}"),
    }
}

/// Asks on stdin, or accepts everything when `--yes` was given
pub struct TerminalConfirm {
    assume_yes: bool,
}

impl TerminalConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        match ask(&format!("{prompt} [y/N] ")) {
            Some(answer) => is_yes(&answer),
            None => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Chooses how an import merges into a non-empty store
pub trait MergePrompt {
    /// `None` cancels the import
    fn choose_merge_mode(&self, current: usize, incoming: usize) -> Option<MergeMode>;
}

pub struct TerminalMergePrompt;

impl MergePrompt for TerminalMergePrompt {
    fn choose_merge_mode(&self, current: usize, incoming: usize) -> Option<MergeMode> {
        let question = format!(
            "The store already has {current} queries and the file has {incoming}.\n\
             [a]dd them to the existing queries, [r]eplace all queries, or cancel? "
        );
        ask(&question).and_then(|answer| answer.trim().parse().ok())
    }
}

/// Print `question` to stderr and read one line from stdin
fn ask(question: &str) -> Option<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{question}").ok()?;
    stderr.flush().ok()?;

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(answer),
    }
}

/// Clipboard commands, tried in order
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip", &[]),
];

/// The platform clipboard, reached through the first clipboard command on `PATH`
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let (program, args) = CLIPBOARD_COMMANDS
            .iter()
            .find_map(|(name, args)| which::which(name).ok().map(|path| (path, *args)))
            .ok_or_else(|| {
                SnipqlError::Clipboard("no clipboard command found on PATH".to_string())
            })?;

        tracing::debug!(program = %program.display(), "Writing to clipboard");

        let mut child = Command::new(&program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SnipqlError::Clipboard(format!("{}: {e}", program.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| SnipqlError::Clipboard(e.to_string()))?;
        }

        let status = child
            .wait()
            .map_err(|e| SnipqlError::Clipboard(e.to_string()))?;
        if !status.success() {
            return Err(SnipqlError::Clipboard(format!(
                "{} exited with {status}",
                program.display()
            )));
        }
        Ok(())
    }
}
