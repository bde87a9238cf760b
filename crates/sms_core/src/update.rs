use crate::{Effect, Msg, ReporterState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ReporterState, msg: Msg) -> (ReporterState, Vec<Effect>) {
    let effects = match msg {
        Msg::PhaseChanged(phase) => {
            // Terminal phases are final; late phase messages from a finished run are dropped.
            if state.is_finished() {
                return (state, Vec::new());
            }
            state.apply_phase(phase)
        }
        Msg::Progress(event) => {
            state.append_event(event);
            Vec::new()
        }
        Msg::OutcomeRecorded { index, outcome } => {
            state.record_outcome(index, outcome);
            Vec::new()
        }
        Msg::CountdownTick => state.tick_countdown(),
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
