use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use sms_core::SendOutcome;
use sms_logging::sms_error;
use tokio_util::sync::CancellationToken;

use crate::{
    AcquisitionError, BatchConfig, BatchEvent, ChannelEventSink, DispatchSettings, EventSink,
    Orchestrator, PushbulletClient, RowSource, TokioPacer,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("failed to start async runtime: {0}")]
    Runtime(String),
    #[error("batch worker panicked")]
    WorkerPanicked,
}

/// Runs a whole batch against the Pushbullet endpoint and returns every outcome.
pub async fn send_batch(
    settings: DispatchSettings,
    config: &BatchConfig,
    source: &dyn RowSource,
    sink: &dyn EventSink,
) -> Result<Vec<SendOutcome>, AcquisitionError> {
    let dispatcher = PushbulletClient::new(settings);
    Orchestrator::new(&dispatcher, &TokioPacer, sink)
        .run_from_source(config, source)
        .await
}

/// A batch running on its own worker thread, observed through its event stream.
pub struct EngineHandle {
    event_rx: mpsc::Receiver<BatchEvent>,
    cancel: CancellationToken,
    worker: thread::JoinHandle<Result<Vec<SendOutcome>, EngineError>>,
}

impl EngineHandle {
    pub fn start(
        settings: DispatchSettings,
        config: BatchConfig,
        source: Box<dyn RowSource>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let worker = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .map_err(|err| {
                    sms_error!("Failed to start batch runtime: {}", err);
                    EngineError::Runtime(err.to_string())
                })?;
            runtime.block_on(async move {
                let dispatcher = PushbulletClient::new(settings);
                let sink = ChannelEventSink::new(event_tx);
                let outcomes = Orchestrator::new(&dispatcher, &TokioPacer, &sink)
                    .with_cancellation(worker_cancel)
                    .run_from_source(&config, source.as_ref())
                    .await?;
                Ok::<_, EngineError>(outcomes)
            })
        });

        Self {
            event_rx,
            cancel,
            worker,
        }
    }

    pub fn try_recv(&self) -> Option<BatchEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<BatchEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Stops the batch at its next send or during the current wait.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Blocks until the worker exits and returns the recorded outcomes.
    pub fn join(self) -> Result<Vec<SendOutcome>, EngineError> {
        self.worker
            .join()
            .map_err(|_| EngineError::WorkerPanicked)?
    }
}
