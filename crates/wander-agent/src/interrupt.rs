//! Open interrupts and the answers that close them

use serde_json::Value;
use wander_proto::{DestinationOption, InterruptKind, InterruptRequest};

use crate::error::PreconditionError;

/// Everything captured from an `interrupt` event, kept until it is answered
#[derive(Debug, Clone, PartialEq)]
pub struct InterruptContext {
    pub kind: InterruptKind,
    pub prompt: String,
    /// Preference field the answer fills in
    pub field: Option<String>,
    pub options: Vec<DestinationOption>,
    pub missing_info: Vec<String>,
    pub budget_allocation: Option<Value>,
}

impl From<InterruptRequest> for InterruptContext {
    fn from(request: InterruptRequest) -> Self {
        Self {
            kind: request.interrupt_type,
            prompt: request.question,
            field: request.field,
            options: request.options.unwrap_or_default(),
            missing_info: request.missing_info.unwrap_or_default(),
            budget_allocation: request.budget_allocation,
        }
    }
}

/// A human-supplied answer
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Zero-based index into the offered options
    Option(usize),
    Text(String),
    Number(serde_json::Number),
}

impl Answer {
    pub fn text(text: impl Into<String>) -> Self {
        Answer::Text(text.into())
    }
}

/// An answer checked against its interrupt
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAnswer {
    /// Value forwarded to the resume request
    pub value: Value,
    /// What the user log entry shows
    pub label: String,
}

impl InterruptContext {
    /// Check `answer` against this interrupt and produce the wire value and label
    pub fn resolve(&self, answer: &Answer) -> Result<ResolvedAnswer, PreconditionError> {
        match (self.kind, answer) {
            (InterruptKind::DestinationSelection, Answer::Option(index)) => {
                let option = self.options.get(*index).ok_or(
                    PreconditionError::OptionOutOfRange {
                        index: *index,
                        len: self.options.len(),
                    },
                )?;
                Ok(ResolvedAnswer {
                    value: Value::from(*index),
                    label: option.label(*index),
                })
            }
            (InterruptKind::DestinationSelection, _) => Err(PreconditionError::AnswerMismatch {
                expected: "an option index",
            }),
            (InterruptKind::Question, Answer::Text(text)) => {
                if text.trim().is_empty() {
                    return Err(PreconditionError::EmptyAnswer);
                }
                Ok(ResolvedAnswer {
                    value: Value::String(text.clone()),
                    label: text.clone(),
                })
            }
            (InterruptKind::Question, Answer::Number(number)) => Ok(ResolvedAnswer {
                value: Value::Number(number.clone()),
                label: number.to_string(),
            }),
            (InterruptKind::Question, Answer::Option(index)) => Ok(ResolvedAnswer {
                value: Value::from(*index),
                label: index.to_string(),
            }),
        }
    }
}
