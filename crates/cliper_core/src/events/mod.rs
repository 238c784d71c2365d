//! UI-agnostic event stream.
//!
//! The runner describes everything it does (status transitions, progress
//! ticks, log lines, state updates) as `Event` values handed to an
//! `EventSink`. Front ends pick the sink that suits their threading model:
//!
//! ```no_run
//! use cliper_core::events::{ChannelSink, Event};
//!
//! let (sink, rx) = ChannelSink::channel();
//! // hand `sink` to a JobRunner running on a worker thread ...
//! while let Ok(event) = rx.try_recv() {
//!     if let Event::Progress(p) = event {
//!         println!("{}/{} {}", p.current, p.total, p.label);
//!     }
//! }
//! # drop(sink);
//! ```

mod sink;
mod types;

pub use sink::{CallbackSink, ChannelSink, EventCallback, EventSink, MemorySink, NullSink};
pub use types::{Event, FieldMap, JobStatusEvent, LogEvent, ProgressEvent, StateEvent};
