//! Request and record types for the planner HTTP API

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::ConversationId;

/// Body of a stream-opening request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamRequest {
    /// Start a new turn with a user message
    Start {
        message: String,
        conversation_id: Option<ConversationId>,
    },
    /// Continue a paused turn with the human-supplied answer
    Resume {
        conversation_id: ConversationId,
        value: Value,
    },
}

impl StreamRequest {
    pub fn start(message: impl Into<String>, conversation_id: Option<ConversationId>) -> Self {
        Self::Start {
            message: message.into(),
            conversation_id,
        }
    }

    pub fn resume(conversation_id: ConversationId, value: Value) -> Self {
        Self::Resume {
            conversation_id,
            value,
        }
    }

    /// Endpoint path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            StreamRequest::Start { .. } => "chat/stream",
            StreamRequest::Resume { .. } => "chat/resume",
        }
    }

    pub fn is_resume(&self) -> bool {
        matches!(self, StreamRequest::Resume { .. })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewConversation {
    pub conversation_id: ConversationId,
}

/// Stored conversation as returned by `GET conversation/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
    /// Server-side planner state (saved preferences)
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

/// Entry of `GET conversations`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub has_itinerary: bool,
}

/// Saved itinerary as returned by `GET itinerary/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryRecord {
    pub id: String,
    pub destination: String,
    pub duration_days: u32,
    pub budget: f64,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub travel_dates: Option<String>,
    /// Day-by-day plan, left uninterpreted
    #[serde(default)]
    pub plan: Option<Value>,
    #[serde(default)]
    pub budget_allocation: Option<Value>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_body_sends_null_id() {
        let body = serde_json::to_value(StreamRequest::start("Plan a trip", None)).unwrap();
        assert_eq!(body, json!({"message": "Plan a trip", "conversation_id": null}));
    }

    #[test]
    fn test_resume_body() {
        let request = StreamRequest::resume(ConversationId::from("c-1"), json!(1));
        assert_eq!(request.path(), "chat/resume");
        assert!(request.is_resume());
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"conversation_id": "c-1", "value": 1}));
    }

    #[test]
    fn test_summary_parses_naive_timestamp() {
        let summary: ConversationSummary = serde_json::from_value(json!({
            "id": "c-1",
            "created_at": "2025-03-14T09:26:53.589793",
            "has_itinerary": true
        }))
        .unwrap();
        assert!(summary.has_itinerary);
        assert!(summary.created_at.is_some());
    }
}
