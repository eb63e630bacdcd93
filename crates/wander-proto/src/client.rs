//! HTTP client for the planner service

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::{
    decoder::decode_events,
    error::{Error, Result},
    event::{ConversationId, EventStream},
    types::{
        ConversationRecord, ConversationSummary, ItineraryRecord, NewConversation, StreamRequest,
    },
};

/// Planner API client
#[derive(Debug, Clone)]
pub struct PlannerClient {
    client: reqwest::Client,
    base_url: String,
}

impl PlannerClient {
    /// Create a client for the API rooted at `base_url` (e.g. `http://localhost:8000/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create with a preconfigured reqwest client
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "server URL must start with http:// or https://: {}",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Open one streaming exchange and return its decoded events
    ///
    /// A non-success status fails before any event is produced. Each call
    /// gets a fresh decoder.
    pub async fn open_stream(
        &self,
        request: &StreamRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream> {
        let url = self.url(request.path());
        tracing::debug!(%url, resume = request.is_resume(), "Opening stream");

        let send = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Aborted),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Stream request rejected");
            return Err(Error::status(status.as_u16(), body));
        }

        Ok(decode_events(response.bytes_stream(), cancel))
    }

    /// Ask the service to allocate a conversation ahead of the first message
    pub async fn new_conversation(&self) -> Result<ConversationId> {
        let response = self.client.post(self.url("conversation/new")).send().await?;
        let created: NewConversation = Self::read_json(response).await?;
        Ok(created.conversation_id)
    }

    pub async fn get_conversation(&self, id: &ConversationId) -> Result<ConversationRecord> {
        self.get_json(&format!("conversation/{}", id)).await
    }

    /// Most recent conversations, newest first
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.get_json("conversations").await
    }

    pub async fn get_itinerary(&self, id: &str) -> Result<ItineraryRecord> {
        self.get_json(&format!("itinerary/{}", id)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            let excerpt: String = text.chars().take(120).collect();
            Error::UnexpectedResponse(format!("{} in {:?}", e, excerpt))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
    }

    fn client_for(server: &MockServer) -> PlannerClient {
        PlannerClient::new(format!("{}/api/", server.uri())).unwrap()
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = PlannerClient::new("localhost:8000").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_open_start_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/stream"))
            .and(body_json(json!({"message": "Plan Kyoto", "conversation_id": null})))
            .respond_with(sse(
                "event: start\r\ndata: {\"type\":\"system\",\"content\":\"Starting travel planning...\",\"conversation_id\":\"c-1\"}\r\n\r\n\
                 event: step\r\ndata: {\"type\":\"step\",\"step\":\"Analyzing\",\"content\":\"ok\"}\r\n\r\n",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let events: Vec<_> = client
            .open_stream(&StreamRequest::start("Plan Kyoto", None), CancellationToken::new())
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].conversation_id, Some(ConversationId::from("c-1")));
        assert!(matches!(events[1].kind, EventKind::Step(_)));
    }

    #[tokio::test]
    async fn test_open_resume_stream_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/resume"))
            .and(body_json(json!({"conversation_id": "c-1", "value": 1})))
            .respond_with(sse("data: {\"type\":\"complete\"}\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = StreamRequest::resume(ConversationId::from("c-1"), json!(1));
        let mut events = client
            .open_stream(&request, CancellationToken::new())
            .await
            .unwrap();
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Complete);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_open_stream_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/stream"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .open_stream(&StreamRequest::start("hi", None), CancellationToken::new())
            .await;
        match result {
            Err(Error::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            Err(other) => panic!("expected status error, got {other}"),
            Ok(_) => panic!("expected status error, got a stream"),
        }
    }

    #[tokio::test]
    async fn test_open_stream_cancelled_before_send() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = client
            .open_stream(&StreamRequest::start("hi", None), cancel)
            .await;
        assert!(matches!(result, Err(Error::Aborted)));
    }

    #[tokio::test]
    async fn test_new_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/conversation/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"conversation_id": "c-9"})))
            .mount(&server)
            .await;

        let id = client_for(&server).new_conversation().await.unwrap();
        assert_eq!(id.as_str(), "c-9");
    }

    #[tokio::test]
    async fn test_get_conversation_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversation/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Conversation not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_conversation(&ConversationId::from("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_list_conversations_and_itinerary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "c-2", "created_at": "2025-03-14T09:26:53.589793", "has_itinerary": true},
                {"id": "c-1", "created_at": null, "has_itinerary": false}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/itinerary/i-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "i-1",
                "destination": "Kyoto",
                "duration_days": 5,
                "budget": 3000,
                "season": "spring",
                "travel_dates": null,
                "plan": {"days": []},
                "budget_allocation": {"daily_budget": 600},
                "created_at": "2025-03-14T09:26:53"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let conversations = client.list_conversations().await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert!(conversations[0].has_itinerary);

        let itinerary = client.get_itinerary("i-1").await.unwrap();
        assert_eq!(itinerary.destination, "Kyoto");
        assert_eq!(itinerary.duration_days, 5);
        assert_eq!(itinerary.season.as_deref(), Some("spring"));
    }

    #[tokio::test]
    async fn test_malformed_record_is_unexpected_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/itinerary/i-2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_itinerary("i-2").await.unwrap_err();
        let Error::UnexpectedResponse(detail) = err else {
            panic!("expected unexpected response, got {:?}", err);
        };
        assert!(detail.contains("<html>gateway</html>"));
    }
}
