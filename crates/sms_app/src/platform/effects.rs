use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use sms_core::{Effect, Msg};
use sms_engine::BatchEvent;
use sms_logging::{sms_debug, sms_info};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Executes reporter effects. Only the display countdown needs a side task.
pub struct EffectRunner {
    ticker: CountdownTicker,
}

impl EffectRunner {
    pub fn new(msg_tx: mpsc::Sender<Msg>) -> Self {
        Self {
            ticker: CountdownTicker::new(msg_tx),
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartCountdown { seconds } => {
                    sms_debug!("Countdown started: {}s", seconds);
                    self.ticker.start(seconds);
                }
                Effect::StopCountdown => self.ticker.stop(),
                Effect::RunFinished { succeeded, failed } => {
                    self.ticker.stop();
                    sms_info!("Run finished: {} sent, {} failed", succeeded, failed);
                }
            }
        }
    }
}

/// Sends `Msg::CountdownTick` once per second while a countdown runs.
///
/// Every start bumps a generation counter; a ticker thread exits as soon as
/// its generation is no longer current.
struct CountdownTicker {
    msg_tx: mpsc::Sender<Msg>,
    generation: Arc<AtomicU64>,
}

impl CountdownTicker {
    fn new(msg_tx: mpsc::Sender<Msg>) -> Self {
        Self {
            msg_tx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn start(&self, seconds: u64) {
        let mine = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let msg_tx = self.msg_tx.clone();
        thread::spawn(move || {
            for _ in 0..seconds {
                thread::sleep(TICK_INTERVAL);
                if generation.load(Ordering::SeqCst) != mine {
                    return;
                }
                if msg_tx.send(Msg::CountdownTick).is_err() {
                    return;
                }
            }
        });
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Forwards engine events to the reporter's message type.
pub fn map_event(event: BatchEvent) -> Msg {
    match event {
        BatchEvent::Phase(phase) => Msg::PhaseChanged(phase),
        BatchEvent::Progress(progress) => Msg::Progress(progress),
        BatchEvent::Outcome { index, outcome } => Msg::OutcomeRecorded { index, outcome },
    }
}
