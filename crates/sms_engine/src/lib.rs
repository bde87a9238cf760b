//! SMS dispatch engine: sheet loading, provider client and the batch run loop.
mod decode;
mod dispatch;
mod engine;
mod orchestrator;
mod pacer;
mod sheet;
mod types;

pub use decode::{decode_sheet, DecodeError, DecodedSheet};
pub use dispatch::{
    DispatchError, DispatchSettings, Dispatcher, PushbulletClient, FAILED_TO_SEND_MESSAGE,
    PUSHBULLET_TEXTS_URL, UNKNOWN_ERROR_MESSAGE,
};
pub use engine::{send_batch, EngineError, EngineHandle};
pub use orchestrator::{
    system_clock, BatchConfig, ChannelEventSink, Clock, EventSink, Orchestrator,
    ALL_PROCESSED_MESSAGE, RUN_CANCELLED_MESSAGE,
};
pub use pacer::{Pacer, TokioPacer};
pub use sheet::{CsvSheet, RowSource, SheetOptions};
pub use types::{AcquisitionError, BatchEvent, Recipient};
