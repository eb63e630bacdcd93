//! Conversation state: identity, lifecycle, open interrupt, progress and history.

use serde::{Deserialize, Serialize};
use std::fmt;
use wander_proto::ConversationId;

use crate::{interrupt::InterruptContext, log::MessageLog};

/// Number of workflow stages in a full planning turn
pub const MAX_PROGRESS: u32 = 8;

/// Lifecycle of the conversation's single stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
    AwaitingHumanInput,
    Failed,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamState::Idle => "idle",
            StreamState::Streaming => "streaming",
            StreamState::AwaitingHumanInput => "awaiting input",
            StreamState::Failed => "failed",
        })
    }
}

/// State owned by the controller. Only its fold step mutates it.
#[derive(Debug, Default)]
pub struct Conversation {
    pub(crate) id: Option<ConversationId>,
    pub(crate) state: StreamState,
    pub(crate) interrupt: Option<InterruptContext>,
    pub(crate) progress: u32,
    pub(crate) current_season: Option<String>,
    pub(crate) log: MessageLog,
}

impl Conversation {
    pub fn id(&self) -> Option<&ConversationId> {
        self.id.as_ref()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn interrupt(&self) -> Option<&InterruptContext> {
        self.interrupt.as_ref()
    }

    /// Completed workflow stages in the current turn
    pub fn progress(&self) -> u32 {
        self.progress
    }

    /// Season most recently named by a `step` event
    pub fn current_season(&self) -> Option<&str> {
        self.current_season.as_deref()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Bind `id` unless an identifier is already bound. Returns whether it bound.
    pub(crate) fn bind_id(&mut self, id: &ConversationId) -> bool {
        match &self.id {
            Some(bound) => {
                if bound != id {
                    tracing::debug!(%bound, ignored = %id, "Ignoring conflicting conversation id");
                }
                false
            }
            None => {
                self.id = Some(id.clone());
                true
            }
        }
    }
}
