use std::io;
use std::path::PathBuf;

use sms_core::{ProgressEvent, RunPhase, SendOutcome};

use crate::DecodeError;

/// Everything the orchestrator reports while a batch runs, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Phase(RunPhase),
    Progress(ProgressEvent),
    Outcome { index: usize, outcome: SendOutcome },
}

/// Who a message goes to; `name` is carried into the outcome unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient<'a> {
    pub name: &'a str,
    pub phone: &'a str,
}

/// Failure to obtain the contact rows. Aborts the run before any send.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("failed to read sheet {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode sheet: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to parse sheet: {0}")]
    Parse(#[from] csv::Error),
    #[error("sheet is missing the {0} column")]
    MissingColumn(&'static str),
}
