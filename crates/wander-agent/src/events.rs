//! Controller event types

use serde::{Deserialize, Serialize};
use wander_proto::ConversationId;

use crate::{conversation::StreamState, log::LogEntry};

/// Notifications emitted while the controller folds a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Lifecycle transition
    StateChanged { from: StreamState, to: StreamState },

    /// The service issued the conversation identifier
    ConversationBound { conversation_id: ConversationId },

    /// A new entry was appended to the message log
    EntryAppended { entry: LogEntry },

    /// Progress counter changed
    Progress { completed: u32, total: u32 },

    /// A `step` event named the travel season
    SeasonObserved { season: String },
}
