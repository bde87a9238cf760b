use std::io::{self, Write};

use sms_core::{format_delay, EventKind, ReporterViewModel, SendOutcome, SendStatus};

/// Erase the current terminal line and return to its start.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// What changed on screen since the previous frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub new_log_lines: Vec<String>,
    pub status: String,
}

/// Turns reporter views into terminal output: new log lines scroll, the
/// status line is redrawn in place.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    printed: usize,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, view: &ReporterViewModel) -> Frame {
        let new_log_lines = view
            .log
            .iter()
            .skip(self.printed)
            .map(|line| format!("{} {}", kind_marker(line.kind), line.text))
            .collect::<Vec<_>>();
        self.printed = view.log.len();
        Frame {
            new_log_lines,
            status: status_line(view),
        }
    }

    pub fn draw(&mut self, view: &ReporterViewModel) -> io::Result<()> {
        let frame = self.frame(view);
        let mut out = io::stdout().lock();
        for line in &frame.new_log_lines {
            writeln!(out, "{CLEAR_LINE}{line}")?;
        }
        write!(out, "{CLEAR_LINE}{}", frame.status)?;
        out.flush()
    }
}

pub fn status_line(view: &ReporterViewModel) -> String {
    let mut line = format!(
        "{} | sent {} | failed {}",
        view.status, view.succeeded, view.failed
    );
    if view.countdown > 0 {
        line.push_str(&format!(
            " | next send in {}",
            format_delay(std::time::Duration::from_secs(view.countdown))
        ));
    }
    line
}

pub fn results_table(outcomes: &[SendOutcome]) -> String {
    let mut table = String::from("Results\n");
    for outcome in outcomes {
        let marker = match outcome.status {
            SendStatus::Success => "[ok]",
            SendStatus::Error => "[error]",
        };
        table.push_str(&format!("{marker:<8}{} ({})", outcome.name, outcome.phone));
        if let Some(message) = &outcome.message {
            table.push_str(&format!(" - {message}"));
        }
        table.push('\n');
    }
    table
}

fn kind_marker(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Success => "+",
        EventKind::Error => "!",
        EventKind::Waiting => "~",
        EventKind::Info => "*",
    }
}
