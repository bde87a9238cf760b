use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use sms_core::{
    normalize, CellValue, Contact, EventKind, Fields, RunPhase, SendOutcome, SendStatus,
};
use sms_engine::{
    AcquisitionError, BatchConfig, BatchEvent, Clock, Dispatcher, EventSink, Orchestrator, Pacer,
    Recipient, RowSource,
};
use tokio_util::sync::CancellationToken;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(sms_logging::initialize_for_tests);
}

/// Answers every send, failing for the listed phone numbers.
#[derive(Default)]
struct ScriptedDispatcher {
    calls: Mutex<Vec<(String, String)>>,
    failing_phones: Vec<&'static str>,
}

impl ScriptedDispatcher {
    fn failing_for(phones: &[&'static str]) -> Self {
        Self {
            failing_phones: phones.to_vec(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Dispatcher for ScriptedDispatcher {
    async fn send(
        &self,
        _credential: &str,
        _device_target: &str,
        recipient: &Recipient<'_>,
        message: &str,
    ) -> SendOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((recipient.phone.to_string(), message.to_string()));
        if self.failing_phones.iter().any(|p| *p == recipient.phone) {
            SendOutcome::error(recipient.name, recipient.phone, "bad token")
        } else {
            SendOutcome::success(
                recipient.name,
                recipient.phone,
                format!("Message sent: \"{message}\""),
            )
        }
    }
}

#[derive(Default)]
struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

#[async_trait::async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, delay: Duration) {
        self.pauses.lock().unwrap().push(delay);
    }
}

/// Cancels the run from inside the first wait and never wakes up on its own.
struct CancellingPacer {
    token: CancellationToken,
}

#[async_trait::async_trait]
impl Pacer for CancellingPacer {
    async fn pause(&self, _delay: Duration) {
        self.token.cancel();
        std::future::pending::<()>().await;
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Arc<Mutex<Vec<BatchEvent>>>,
}

impl CollectingSink {
    fn take(&self) -> Vec<BatchEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: BatchEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct BrokenSheet;

#[async_trait::async_trait]
impl RowSource for BrokenSheet {
    async fn load(&self) -> Result<Vec<Fields>, AcquisitionError> {
        Err(AcquisitionError::MissingColumn("PhoneNumber"))
    }
}

fn fixed_clock() -> Clock {
    Arc::new(|| Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
}

fn config(delay: Duration) -> BatchConfig {
    BatchConfig {
        credential: "o.token".into(),
        device_target: "device-1".into(),
        default_template: "Hi {Name}".into(),
        inter_send_delay: delay,
    }
}

fn row(pairs: &[(&str, &str)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
        .collect()
}

fn contacts(rows: Vec<Fields>) -> Vec<Contact> {
    normalize(rows)
}

fn phases(events: &[BatchEvent]) -> Vec<RunPhase> {
    events
        .iter()
        .filter_map(|event| match event {
            BatchEvent::Phase(phase) => Some(phase.clone()),
            _ => None,
        })
        .collect()
}

fn progress(events: &[BatchEvent]) -> Vec<(EventKind, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            BatchEvent::Progress(p) => Some((p.kind, p.message.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn missing_name_row_is_rejected_without_a_send() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[("Name", "Ann"), ("PhoneNumber", "+1111")]),
        row(&[("Name", ""), ("PhoneNumber", "+2222")]),
    ];

    let outcomes = Orchestrator::new(&dispatcher, &pacer, &sink)
        .with_clock(fixed_clock())
        .run(&config(Duration::from_secs(2)), &contacts(rows))
        .await;

    assert_eq!(
        outcomes,
        vec![
            SendOutcome::success("Ann", "+1111", "Message sent: \"Hi Ann\""),
            SendOutcome::error("Unknown", "+2222", "Missing name or phone number"),
        ]
    );
    assert_eq!(
        dispatcher.calls(),
        vec![("+1111".to_string(), "Hi Ann".to_string())]
    );
    // One wait after Ann; the rejected last row never waits.
    assert_eq!(*pacer.pauses.lock().unwrap(), vec![Duration::from_secs(2)]);
}

#[tokio::test]
async fn delay_runs_between_sends_but_not_after_the_last() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[("Name", "Ann"), ("PhoneNumber", "+1")]),
        row(&[("Name", "Bob"), ("PhoneNumber", "+2")]),
        row(&[("Name", "Cy"), ("PhoneNumber", "+3")]),
    ];
    let delay = Duration::from_secs(450);

    let outcomes = Orchestrator::new(&dispatcher, &pacer, &sink)
        .run(&config(delay), &contacts(rows))
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(*pacer.pauses.lock().unwrap(), vec![delay, delay]);

    let events = sink.take();
    let waits = progress(&events)
        .into_iter()
        .filter(|(kind, _)| *kind == EventKind::Waiting)
        .map(|(_, message)| message)
        .collect::<Vec<_>>();
    assert_eq!(
        waits,
        vec![
            "Waiting 7m 30s before next message...".to_string(),
            "Waiting 7m 30s before next message...".to_string(),
        ]
    );
    assert_eq!(phases(&events).last(), Some(&RunPhase::Completed));
}

#[tokio::test]
async fn failed_sends_are_recorded_and_the_batch_continues() {
    init_logging();
    let dispatcher = ScriptedDispatcher::failing_for(&["+2"]);
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[("Name", "Ann"), ("PhoneNumber", "+1")]),
        row(&[("Name", "Bob"), ("PhoneNumber", "+2")]),
        row(&[("Name", "Cy"), ("PhoneNumber", "+3")]),
    ];

    let outcomes = Orchestrator::new(&dispatcher, &pacer, &sink)
        .run(&config(Duration::from_secs(1)), &contacts(rows))
        .await;

    let statuses = outcomes.iter().map(|o| o.status).collect::<Vec<_>>();
    assert_eq!(
        statuses,
        vec![SendStatus::Success, SendStatus::Error, SendStatus::Success]
    );
    assert_eq!(outcomes[1].message.as_deref(), Some("bad token"));
    assert_eq!(dispatcher.calls().len(), 3);

    let log = progress(&sink.take());
    assert!(log.contains(&(
        EventKind::Error,
        "Failed to send to Bob (+2): bad token".to_string()
    )));
    assert_eq!(
        log.last(),
        Some(&(EventKind::Info, "All messages processed!".to_string()))
    );
}

#[tokio::test]
async fn own_text_message_and_extra_columns_drive_rendering() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[
            ("Name", "Ann"),
            ("PhoneNumber", "+1"),
            ("TextMessage", "{{Name}}, your table at {Venue} is ready"),
            ("Venue", "Luigi's"),
        ]),
        row(&[("Name", "Bob"), ("PhoneNumber", "+2"), ("Venue", "Luigi's")]),
    ];

    Orchestrator::new(&dispatcher, &pacer, &sink)
        .run(&config(Duration::ZERO), &contacts(rows))
        .await;

    assert_eq!(
        dispatcher.calls(),
        vec![
            ("+1".to_string(), "Ann, your table at Luigi's is ready".to_string()),
            ("+2".to_string(), "Hi Bob".to_string()),
        ]
    );
    assert_eq!(*pacer.pauses.lock().unwrap(), vec![Duration::ZERO]);
}

#[tokio::test]
async fn zero_delay_still_waits_between_sends() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[("Name", "Ann"), ("PhoneNumber", "+1")]),
        row(&[("Name", "Bob"), ("PhoneNumber", "+2")]),
        row(&[("Name", "Cy"), ("PhoneNumber", "+3")]),
    ];

    Orchestrator::new(&dispatcher, &pacer, &sink)
        .run(&config(Duration::ZERO), &contacts(rows))
        .await;

    assert_eq!(
        *pacer.pauses.lock().unwrap(),
        vec![Duration::ZERO, Duration::ZERO]
    );
    let events = sink.take();
    let waiting_phases = phases(&events)
        .into_iter()
        .filter(|phase| matches!(phase, RunPhase::Waiting { .. }))
        .count();
    assert_eq!(waiting_phases, 2);
    let waits = progress(&events)
        .into_iter()
        .filter(|(kind, _)| *kind == EventKind::Waiting)
        .map(|(_, message)| message)
        .collect::<Vec<_>>();
    assert_eq!(
        waits,
        vec![
            "Waiting 0m 0s before next message...".to_string(),
            "Waiting 0m 0s before next message...".to_string(),
        ]
    );
}

#[tokio::test]
async fn events_follow_contact_order() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[("Name", "Ann"), ("PhoneNumber", "+1")]),
        row(&[("PhoneNumber", "+2")]),
    ];

    Orchestrator::new(&dispatcher, &pacer, &sink)
        .with_clock(fixed_clock())
        .run(&config(Duration::from_secs(2)), &contacts(rows))
        .await;

    let events = sink.take();
    assert_eq!(
        phases(&events),
        vec![
            RunPhase::Sending {
                position: 1,
                total: 2,
                name: "Ann".into()
            },
            RunPhase::Waiting {
                delay: Duration::from_secs(2)
            },
            RunPhase::Sending {
                position: 2,
                total: 2,
                name: "Unknown".into()
            },
            RunPhase::Completed,
        ]
    );

    let indices = events
        .iter()
        .filter_map(|event| match event {
            BatchEvent::Outcome { index, .. } => Some(*index),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(indices, vec![0, 1]);

    // Every event shares the fixed clock tick, ids still differ.
    let mut ids = events
        .iter()
        .filter_map(|event| match event {
            BatchEvent::Progress(p) => Some(p.id),
            _ => None,
        })
        .collect::<Vec<_>>();
    let count = ids.len();
    ids.dedup();
    assert_eq!(ids.len(), count);
}

#[tokio::test]
async fn acquisition_failure_aborts_before_any_send() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();

    let result = Orchestrator::new(&dispatcher, &pacer, &sink)
        .run_from_source(&config(Duration::from_secs(2)), &BrokenSheet)
        .await;

    assert!(matches!(
        result,
        Err(AcquisitionError::MissingColumn("PhoneNumber"))
    ));
    assert!(dispatcher.calls().is_empty());

    let events = sink.take();
    assert!(!events
        .iter()
        .any(|event| matches!(event, BatchEvent::Outcome { .. })));
    assert_eq!(
        phases(&events),
        vec![
            RunPhase::Loading,
            RunPhase::Failed {
                error: "sheet is missing the PhoneNumber column".into()
            },
        ]
    );
    assert_eq!(
        progress(&events),
        vec![(
            EventKind::Error,
            "Failed to load contacts: sheet is missing the PhoneNumber column".to_string()
        )]
    );
}

#[tokio::test]
async fn in_memory_rows_run_through_the_source_path() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[("Name", "Ann"), ("PhoneNumber", "+1")]),
        row(&[("Name", "Bob")]),
    ];

    let outcomes = Orchestrator::new(&dispatcher, &pacer, &sink)
        .run_from_source(&config(Duration::from_secs(1)), &rows)
        .await
        .expect("rows load");

    assert_eq!(outcomes.len(), rows.len());
    assert_eq!(outcomes[1].phone, "Missing");
    assert_eq!(phases(&sink.take())[0], RunPhase::Loading);
}

#[tokio::test]
async fn cancellation_during_a_wait_stops_the_run() {
    init_logging();
    let token = CancellationToken::new();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = CancellingPacer {
        token: token.clone(),
    };
    let sink = CollectingSink::default();
    let rows = vec![
        row(&[("Name", "Ann"), ("PhoneNumber", "+1")]),
        row(&[("Name", "Bob"), ("PhoneNumber", "+2")]),
    ];

    let outcomes = Orchestrator::new(&dispatcher, &pacer, &sink)
        .with_cancellation(token)
        .run(&config(Duration::from_secs(60)), &contacts(rows))
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(dispatcher.calls().len(), 1);
    let events = sink.take();
    assert_eq!(phases(&events).last(), Some(&RunPhase::Cancelled));
    assert_eq!(
        progress(&events).last(),
        Some(&(EventKind::Error, "Run cancelled".to_string()))
    );
}

#[tokio::test]
async fn cancelled_token_prevents_the_first_send() {
    init_logging();
    let token = CancellationToken::new();
    token.cancel();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();

    let outcomes = Orchestrator::new(&dispatcher, &pacer, &sink)
        .with_cancellation(token)
        .run(
            &config(Duration::from_secs(1)),
            &contacts(vec![row(&[("Name", "Ann"), ("PhoneNumber", "+1")])]),
        )
        .await;

    assert!(outcomes.is_empty());
    assert!(dispatcher.calls().is_empty());
}

#[tokio::test]
async fn unknown_default_template_keys_are_announced() {
    init_logging();
    let dispatcher = ScriptedDispatcher::default();
    let pacer = RecordingPacer::default();
    let sink = CollectingSink::default();
    let rows = vec![row(&[("Name", "Ann"), ("PhoneNumber", "+1")])];
    let config = BatchConfig {
        default_template: "Hi {Name}, see you {{ Day }}".into(),
        ..config(Duration::ZERO)
    };

    Orchestrator::new(&dispatcher, &pacer, &sink)
        .run_from_source(&config, &rows)
        .await
        .expect("rows load");

    assert!(progress(&sink.take()).contains(&(
        EventKind::Info,
        "Placeholder {Day} matches no sheet column and will be sent as is".to_string()
    )));
    assert_eq!(
        dispatcher.calls(),
        vec![("+1".to_string(), "Hi Ann, see you {{ Day }}".to_string())]
    );
}
