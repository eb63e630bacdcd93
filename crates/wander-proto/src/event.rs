//! Streaming event types

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::fmt;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::error::Result;

/// Conversation identifier issued by the planner service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Event payload, one variant per `type` tag on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Service narration
    System(Narration),
    /// Agent narration
    Message(Narration),
    /// A workflow stage completed
    Step(StepUpdate),
    Research(StepUpdate),
    Analysis(StepUpdate),
    Season(StepUpdate),
    Planning(StepUpdate),
    /// The workflow paused for human input
    Interrupt(InterruptRequest),
    /// Server acknowledgement of a resume
    Resume,
    /// Final itinerary
    Result(ItineraryReady),
    /// End of a turn that produced no itinerary
    Complete,
    /// Failure reported by the service
    Error(Failure),
}

/// Free-text narration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    #[serde(default)]
    pub content: String,
}

/// One completed workflow stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepUpdate {
    /// Short stage label, e.g. "Researching Destinations"
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub content: String,
    /// Stage-specific payload, passed through untouched
    #[serde(default)]
    pub data: Option<Value>,
}

impl StepUpdate {
    /// Season named by the stage payload, if any
    pub fn season(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("season"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Workflow stages that count towards turn progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Step,
    Research,
    Analysis,
    Season,
    Planning,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Step => "step",
            Stage::Research => "research",
            Stage::Analysis => "analysis",
            Stage::Season => "season",
            Stage::Planning => "planning",
        }
    }
}

/// Kind of human input the service is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptKind {
    /// Free-form answer to a question about one preference field
    Question,
    /// Pick one of the offered destinations by index
    DestinationSelection,
}

/// Payload of an `interrupt` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptRequest {
    pub interrupt_type: InterruptKind,
    pub question: String,
    /// Preference field the answer fills in (e.g. "budget", "season")
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<DestinationOption>>,
    #[serde(default)]
    pub missing_info: Option<Vec<String>>,
    #[serde(default)]
    pub budget_allocation: Option<Value>,
}

/// One selectable destination offered by a `destination_selection` interrupt
///
/// Only the name matters for answering. Any known field that is null or has
/// an unexpected type is left in `extra` instead of rejecting the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct DestinationOption {
    pub index: Option<usize>,
    pub name: Option<String>,
    pub avg_daily_cost: Option<f64>,
    pub best_season: Option<String>,
    pub season_notes: Option<String>,
    pub description: Option<String>,
    pub highlights: Vec<String>,
    /// Keys this client does not know about, or could not type
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for DestinationOption {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            index: take_typed(&mut fields, "index"),
            name: take_typed(&mut fields, "name"),
            avg_daily_cost: take_typed(&mut fields, "avg_daily_cost"),
            best_season: take_typed(&mut fields, "best_season"),
            season_notes: take_typed(&mut fields, "season_notes"),
            description: take_typed(&mut fields, "description"),
            highlights: take_typed(&mut fields, "highlights").unwrap_or_default(),
            extra: fields,
        }
    }
}

/// Remove `key` if it holds a `T`; a value of any other type stays in `fields`
fn take_typed<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.remove(key)?;
    if value.is_null() {
        return None;
    }
    match T::deserialize(&value) {
        Ok(typed) => Some(typed),
        Err(_) => {
            fields.insert(key.to_string(), value);
            None
        }
    }
}

impl DestinationOption {
    /// Display label, falling back to a 1-based positional label
    pub fn label(&self, position: usize) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("Option {}", position + 1),
        }
    }
}

/// Payload of a `result` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryReady {
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub itinerary: Option<Value>,
    #[serde(default)]
    pub itinerary_id: Option<String>,
}

/// Payload of an `error` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    #[serde(default)]
    pub content: Option<String>,
}

/// A parsed stream event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Identifier carried by the event, if any
    pub conversation_id: Option<ConversationId>,
    /// The event object exactly as received
    pub raw: Value,
}

impl Event {
    /// Parse one frame payload (the JSON text after the `data: ` prefix)
    pub fn parse(payload: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(payload)?;
        let kind = EventKind::deserialize(&raw)?;
        let conversation_id = raw
            .get("conversation_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(ConversationId::from);
        Ok(Self {
            kind,
            conversation_id,
            raw,
        })
    }

    /// Wire tag of this event
    pub fn tag(&self) -> &'static str {
        match &self.kind {
            EventKind::System(_) => "system",
            EventKind::Message(_) => "message",
            EventKind::Step(_) => "step",
            EventKind::Research(_) => "research",
            EventKind::Analysis(_) => "analysis",
            EventKind::Season(_) => "season",
            EventKind::Planning(_) => "planning",
            EventKind::Interrupt(_) => "interrupt",
            EventKind::Resume => "resume",
            EventKind::Result(_) => "result",
            EventKind::Complete => "complete",
            EventKind::Error(_) => "error",
        }
    }
}

/// A stream of parsed events from one session
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;
