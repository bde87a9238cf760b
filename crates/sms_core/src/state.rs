use crate::phase::countdown_seconds;
use crate::view_model::{LogLineView, ReporterViewModel};
use crate::{Effect, ProgressEvent, RunPhase, SendOutcome};

const IDLE_STATUS: &str = "Idle";

/// Read-side projection of one batch run, fed only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterState {
    phase: Option<RunPhase>,
    status: String,
    countdown: u64,
    countdown_active: bool,
    log: Vec<ProgressEvent>,
    outcomes: Vec<SendOutcome>,
    dirty: bool,
}

impl Default for ReporterState {
    fn default() -> Self {
        Self {
            phase: None,
            status: IDLE_STATUS.to_string(),
            countdown: 0,
            countdown_active: false,
            log: Vec::new(),
            outcomes: Vec::new(),
            dirty: false,
        }
    }
}

impl ReporterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ReporterViewModel {
        let succeeded = self.succeeded();
        ReporterViewModel {
            status: self.status.clone(),
            countdown: self.countdown,
            log: self.log.iter().map(LogLineView::from_event).collect(),
            outcomes: self.outcomes.clone(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
            finished: self.is_finished(),
            dirty: self.dirty,
        }
    }

    pub fn phase(&self) -> Option<&RunPhase> {
        self.phase.as_ref()
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.log
    }

    pub fn outcomes(&self) -> &[SendOutcome] {
        &self.outcomes
    }

    pub fn is_finished(&self) -> bool {
        self.phase.as_ref().is_some_and(RunPhase::is_terminal)
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn apply_phase(&mut self, phase: RunPhase) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.countdown_active {
            self.countdown_active = false;
            effects.push(Effect::StopCountdown);
        }
        self.countdown = 0;

        if let RunPhase::Waiting { delay } = &phase {
            let seconds = countdown_seconds(*delay);
            if seconds > 0 {
                self.countdown = seconds;
                self.countdown_active = true;
                // A restart replaces the stop queued above.
                effects.retain(|effect| *effect != Effect::StopCountdown);
                effects.push(Effect::StartCountdown { seconds });
            }
        }

        if phase.is_terminal() {
            let succeeded = self.succeeded();
            effects.push(Effect::RunFinished {
                succeeded,
                failed: self.outcomes.len() - succeeded,
            });
        }

        self.status = phase.describe();
        self.phase = Some(phase);
        self.dirty = true;
        effects
    }

    /// Appends `event` unless an event with the same id was already logged.
    pub(crate) fn append_event(&mut self, event: ProgressEvent) {
        if self.log.iter().any(|known| known.id == event.id) {
            return;
        }
        self.log.push(event);
        self.dirty = true;
    }

    /// Records `outcome` only when it is the next one in contact order.
    pub(crate) fn record_outcome(&mut self, index: usize, outcome: SendOutcome) {
        if index != self.outcomes.len() {
            return;
        }
        self.outcomes.push(outcome);
        self.dirty = true;
    }

    pub(crate) fn tick_countdown(&mut self) -> Vec<Effect> {
        if !self.countdown_active {
            return Vec::new();
        }
        self.countdown = self.countdown.saturating_sub(1);
        self.dirty = true;
        if self.countdown == 0 {
            self.countdown_active = false;
            return vec![Effect::StopCountdown];
        }
        Vec::new()
    }

    fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}
