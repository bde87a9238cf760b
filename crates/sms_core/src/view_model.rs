use crate::{EventKind, ProgressEvent, SendOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReporterViewModel {
    pub status: String,
    /// Seconds until the next send; zero outside of a wait.
    pub countdown: u64,
    pub log: Vec<LogLineView>,
    pub outcomes: Vec<SendOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub finished: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLineView {
    pub id: String,
    pub kind: EventKind,
    /// `[HH:MM:SS] message`, UTC.
    pub text: String,
}

impl LogLineView {
    pub(crate) fn from_event(event: &ProgressEvent) -> Self {
        Self {
            id: event.id.to_string(),
            kind: event.kind,
            text: format!("[{}] {}", event.timestamp.format("%H:%M:%S"), event.message),
        }
    }
}
