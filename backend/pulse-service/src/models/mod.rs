pub mod event;
pub mod log_record;

pub use event::{Event, EventAction, RawEvent};
pub use log_record::{LogLevel, LogRecord};
