//! SMS dispatch core: pure row/template logic and the progress reporter state machine.
mod cell;
mod contact;
mod effect;
mod event;
mod msg;
mod outcome;
mod phase;
mod state;
mod template;
mod update;
mod view_model;

pub use cell::{CellValue, Fields};
pub use contact::{
    normalize, Contact, RowValidationError, MISSING_CONTACT_MESSAGE, MISSING_PHONE_SENTINEL,
    NAME_FIELD, PHONE_FIELD, TEXT_MESSAGE_FIELD, UNKNOWN_NAME_SENTINEL,
};
pub use effect::Effect;
pub use event::{EventId, EventKind, EventStamper, ProgressEvent};
pub use msg::Msg;
pub use outcome::{SendOutcome, SendStatus};
pub use phase::{countdown_seconds, format_delay, RunPhase};
pub use state::ReporterState;
pub use template::{placeholders, render};
pub use update::update;
pub use view_model::{LogLineView, ReporterViewModel};
