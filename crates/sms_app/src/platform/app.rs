use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use sms_core::{update, Msg, ReporterState, SendOutcome};
use sms_engine::{CsvSheet, DispatchSettings, EngineError, EngineHandle};
use sms_logging::{sms_info, sms_warn};

use super::cli::Args;
use super::config::{self, FileConfig};
use super::effects::{map_event, EffectRunner};
use super::logging;
use super::render::{results_table, TerminalRenderer};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code when the run completed but at least one message failed.
const SOME_SENDS_FAILED: u8 = 2;

pub fn run_app(args: Args) -> anyhow::Result<ExitCode> {
    logging::initialize(args.log);

    let file_config = match &args.config {
        Some(path) => config::load_file_config(path)?,
        None => FileConfig::default(),
    };
    let settings = config::resolve(&args, file_config)?;
    sms_info!("Starting batch from {:?}", settings.sheet_path);

    let engine = EngineHandle::start(
        DispatchSettings::default(),
        settings.batch,
        Box::new(CsvSheet::from_path(settings.sheet_path, settings.sheet)),
    );

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let effects = EffectRunner::new(msg_tx.clone());
    let forwarder = spawn_event_forwarder(engine, msg_tx);

    let mut state = ReporterState::new();
    let mut renderer = TerminalRenderer::new();
    loop {
        let finished = forwarder.is_finished();
        // Everything the forwarder sent is already queued once it has exited.
        let inbox: Vec<Msg> = if finished {
            msg_rx.try_iter().collect()
        } else {
            msg_rx.recv_timeout(POLL_INTERVAL).into_iter().collect()
        };
        for msg in inbox {
            state = dispatch_msg(state, msg, &effects);
        }
        if state.consume_dirty() {
            renderer.draw(&state.view())?;
        }
        if finished {
            break;
        }
    }
    println!();

    let outcomes = forwarder
        .join()
        .map_err(|_| anyhow!("event forwarder panicked"))?
        .context("batch did not run")?;

    print!("{}", results_table(&outcomes));
    Ok(exit_code(&outcomes))
}

fn dispatch_msg(state: ReporterState, msg: Msg, effects: &EffectRunner) -> ReporterState {
    let (state, pending) = update(state, msg);
    effects.enqueue(pending);
    state
}

/// Pumps engine events into the reporter inbox until the run ends, then
/// hands back the run result.
fn spawn_event_forwarder(
    engine: EngineHandle,
    msg_tx: mpsc::Sender<Msg>,
) -> thread::JoinHandle<Result<Vec<SendOutcome>, EngineError>> {
    thread::spawn(move || {
        loop {
            if let Some(event) = engine.recv_timeout(POLL_INTERVAL) {
                let _ = msg_tx.send(map_event(event));
            } else if engine.is_finished() {
                break;
            }
        }
        while let Some(event) = engine.try_recv() {
            let _ = msg_tx.send(map_event(event));
        }
        engine.join()
    })
}

fn exit_code(outcomes: &[SendOutcome]) -> ExitCode {
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        sms_warn!("{} of {} messages failed", failed, outcomes.len());
        ExitCode::from(SOME_SENDS_FAILED)
    }
}
