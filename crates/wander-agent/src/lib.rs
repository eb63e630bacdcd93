//! wander-agent: conversation controller for the travel planner
//!
//! This crate drives one conversation at a time: it opens stream sessions,
//! folds their events into conversation state and a message log, and pauses
//! when the planner asks the user a question.

pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod interrupt;
pub mod log;
pub mod transport;

pub use controller::{Controller, ControllerConfig};
pub use conversation::{Conversation, MAX_PROGRESS, StreamState};
pub use error::{Error, PreconditionError, Result};
pub use events::ControllerEvent;
pub use handle::ControllerHandle;
pub use interrupt::{Answer, InterruptContext, ResolvedAnswer};
pub use log::{EntryKind, LogEntry, MessageLog};
pub use transport::{HttpTransport, Transport};
