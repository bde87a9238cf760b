//! Sequential batch run: one contact at a time, paced by a fixed delay.
//!
//! Outcomes and events leave in contact order. Per-contact failures are
//! recorded and the run carries on; only a failed row load aborts the run.

use std::sync::{mpsc, Arc};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sms_core::{
    format_delay, normalize, placeholders, render, Contact, EventKind, EventStamper, RunPhase,
    SendOutcome,
};
use sms_logging::{sms_error, sms_info, sms_warn};
use tokio_util::sync::CancellationToken;

use crate::{AcquisitionError, BatchEvent, Dispatcher, Pacer, Recipient, RowSource};

pub const ALL_PROCESSED_MESSAGE: &str = "All messages processed!";
pub const RUN_CANCELLED_MESSAGE: &str = "Run cancelled";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub credential: String,
    pub device_target: String,
    /// Used for contacts without their own `TextMessage`.
    pub default_template: String,
    pub inter_send_delay: Duration,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<BatchEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<BatchEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }
}

pub struct Orchestrator<'a> {
    dispatcher: &'a dyn Dispatcher,
    pacer: &'a dyn Pacer,
    sink: &'a dyn EventSink,
    clock: Clock,
    cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(dispatcher: &'a dyn Dispatcher, pacer: &'a dyn Pacer, sink: &'a dyn EventSink) -> Self {
        Self {
            dispatcher,
            pacer,
            sink,
            clock: system_clock(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Loads rows from `source`, then runs the batch over them.
    pub async fn run_from_source(
        &self,
        config: &BatchConfig,
        source: &dyn RowSource,
    ) -> Result<Vec<SendOutcome>, AcquisitionError> {
        let mut run = BatchRun::new(self);
        run.phase(RunPhase::Loading);

        let rows = match source.load().await {
            Ok(rows) => rows,
            Err(err) => {
                sms_error!("Failed to load contacts: {}", err);
                run.log(EventKind::Error, format!("Failed to load contacts: {err}"));
                run.phase(RunPhase::Failed {
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        let contacts = normalize(rows);
        run.log(EventKind::Info, format!("Loaded {} contacts", contacts.len()));
        for key in unknown_placeholders(&config.default_template, &contacts) {
            sms_warn!("Default template placeholder {{{}}} matches no sheet column", key);
            run.log(
                EventKind::Info,
                format!("Placeholder {{{key}}} matches no sheet column and will be sent as is"),
            );
        }
        Ok(run.drive(config, &contacts).await)
    }

    /// Runs the batch over already normalized contacts.
    pub async fn run(&self, config: &BatchConfig, contacts: &[Contact]) -> Vec<SendOutcome> {
        BatchRun::new(self).drive(config, contacts).await
    }
}

/// Placeholder keys of `template` that no contact row can fill.
fn unknown_placeholders(template: &str, contacts: &[Contact]) -> Vec<String> {
    placeholders(template)
        .into_iter()
        .filter(|key| {
            !contacts.is_empty() && !contacts.iter().any(|c| c.fields.contains_key(key))
        })
        .collect()
}

/// State of one pass over the contacts. Owned by the run; observers only see events.
struct BatchRun<'o, 'a> {
    orchestrator: &'o Orchestrator<'a>,
    stamper: EventStamper,
    outcomes: Vec<SendOutcome>,
}

impl<'o, 'a> BatchRun<'o, 'a> {
    fn new(orchestrator: &'o Orchestrator<'a>) -> Self {
        Self {
            orchestrator,
            stamper: EventStamper::new(),
            outcomes: Vec::new(),
        }
    }

    async fn drive(mut self, config: &BatchConfig, contacts: &[Contact]) -> Vec<SendOutcome> {
        let total = contacts.len();
        let cancel = self.orchestrator.cancel.clone();
        let dispatcher = self.orchestrator.dispatcher;
        let pacer = self.orchestrator.pacer;
        sms_info!(
            "Starting batch of {} contacts, delay {}",
            total,
            format_delay(config.inter_send_delay)
        );

        for (position, contact) in contacts.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.cancelled();
            }

            self.phase(RunPhase::Sending {
                position: position + 1,
                total,
                name: contact.display_name().to_string(),
            });

            let (name, phone) = match contact.validate() {
                Ok(valid) => valid,
                Err(err) => {
                    sms_warn!("Row {} rejected: {}", contact.index, err);
                    self.log(
                        EventKind::Error,
                        format!(
                            "{} ({}): {}",
                            contact.display_name(),
                            contact.display_phone(),
                            err
                        ),
                    );
                    self.record(SendOutcome::error(
                        contact.display_name(),
                        contact.display_phone(),
                        err.to_string(),
                    ));
                    continue;
                }
            };

            let message = render(contact.template(&config.default_template), &contact.fields);
            let recipient = Recipient { name, phone };
            let outcome = dispatcher
                .send(&config.credential, &config.device_target, &recipient, &message)
                .await;

            if outcome.is_success() {
                self.log(EventKind::Success, format!("Message sent to {name} ({phone})"));
            } else {
                let reason = outcome.message.as_deref().unwrap_or_default();
                self.log(
                    EventKind::Error,
                    format!("Failed to send to {name} ({phone}): {reason}"),
                );
            }
            self.record(outcome);

            if position + 1 == total {
                continue;
            }

            let delay = config.inter_send_delay;
            self.phase(RunPhase::Waiting { delay });
            self.log(
                EventKind::Waiting,
                format!("Waiting {} before next message...", format_delay(delay)),
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(),
                _ = pacer.pause(delay) => {}
            }
        }

        let failed = self.outcomes.iter().filter(|o| !o.is_success()).count();
        sms_info!(
            "Batch finished: {} sent, {} failed",
            self.outcomes.len() - failed,
            failed
        );
        self.log(EventKind::Info, ALL_PROCESSED_MESSAGE);
        self.phase(RunPhase::Completed);
        self.outcomes
    }

    fn cancelled(mut self) -> Vec<SendOutcome> {
        sms_warn!("Batch cancelled after {} outcomes", self.outcomes.len());
        self.log(EventKind::Error, RUN_CANCELLED_MESSAGE);
        self.phase(RunPhase::Cancelled);
        self.outcomes
    }

    fn record(&mut self, outcome: SendOutcome) {
        let index = self.outcomes.len();
        self.outcomes.push(outcome.clone());
        self.orchestrator
            .sink
            .emit(BatchEvent::Outcome { index, outcome });
    }

    fn phase(&self, phase: RunPhase) {
        self.orchestrator.sink.emit(BatchEvent::Phase(phase));
    }

    fn log(&mut self, kind: EventKind, message: impl Into<String>) {
        let now = (self.orchestrator.clock)();
        let event = self.stamper.stamp(now, kind, message);
        self.orchestrator.sink.emit(BatchEvent::Progress(event));
    }
}
