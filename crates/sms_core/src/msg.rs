use crate::{ProgressEvent, RunPhase, SendOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Orchestrator moved to a new phase.
    PhaseChanged(RunPhase),
    /// Orchestrator appended a progress log entry.
    Progress(ProgressEvent),
    /// Orchestrator recorded the outcome for the contact at `index`.
    OutcomeRecorded { index: usize, outcome: SendOutcome },
    /// One second elapsed on the display countdown.
    CountdownTick,
    /// Fallback for placeholder wiring.
    NoOp,
}
