//! Error types for wander-agent

use thiserror::Error;

use crate::conversation::StreamState;

/// Result type alias using wander-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned to the code driving the controller
///
/// Transport failures and errors reported by the service are not returned
/// here; they end the turn and show up in the message log.
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the protocol layer (client construction, lookups)
    #[error(transparent)]
    Proto(#[from] wander_proto::Error),

    /// The operation is not valid in the current conversation state
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

impl Error {
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition(_))
    }
}

/// Caller-side protocol violations, detected before anything is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Cannot send a message while the conversation is {state}")]
    NotIdle { state: StreamState },

    #[error("No question is waiting for an answer (conversation is {state})")]
    NotAwaitingInput { state: StreamState },

    #[error("No conversation has been started")]
    NoConversation,

    #[error("No interrupt is open")]
    NoInterrupt,

    #[error("Option {index} does not exist ({len} options offered)")]
    OptionOutOfRange { index: usize, len: usize },

    #[error("Answer does not fit the open interrupt: expected {expected}")]
    AnswerMismatch { expected: &'static str },

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Answer is empty")]
    EmptyAnswer,
}
