//! Conversation controller: opens sessions and folds their events

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::broadcast;
use wander_proto::{
    ConversationId, Event, EventKind, InterruptKind, ItineraryReady, Narration, Stage, StepUpdate,
    StreamRequest,
};

use crate::{
    conversation::{Conversation, MAX_PROGRESS, StreamState},
    error::{PreconditionError, Result},
    events::ControllerEvent,
    handle::ControllerHandle,
    interrupt::{Answer, InterruptContext},
    log::{EntryKind, LogEntry, MessageLog},
    transport::Transport,
};

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Hide transient narration such as "Starting travel planning..."
    pub suppress_bootstrap: bool,
    /// Prefixes of narration hidden when `suppress_bootstrap` is set
    pub bootstrap_phrases: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            suppress_bootstrap: true,
            bootstrap_phrases: vec!["Starting".to_string(), "Processing".to_string()],
        }
    }
}

impl ControllerConfig {
    fn is_bootstrap(&self, content: &str) -> bool {
        let content = content.trim_start();
        self.suppress_bootstrap
            && self
                .bootstrap_phrases
                .iter()
                .any(|phrase| content.starts_with(phrase.as_str()))
    }
}

/// Whether the session should keep being read after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Drives one conversation: a single writer over its state and message log
pub struct Controller {
    config: ControllerConfig,
    conversation: Conversation,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<ControllerEvent>,
    handle: ControllerHandle,
}

impl Controller {
    /// Create a controller for a fresh conversation
    pub fn new(config: ControllerConfig, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            conversation: Conversation::default(),
            transport,
            event_tx,
            handle: ControllerHandle::new(),
        }
    }

    /// Continue a conversation whose identifier the service issued earlier
    pub fn with_conversation(
        config: ControllerConfig,
        transport: Arc<dyn Transport>,
        conversation_id: ConversationId,
    ) -> Self {
        let mut controller = Self::new(config, transport);
        controller.conversation.bind_id(&conversation_id);
        controller
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> StreamState {
        self.conversation.state()
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation.id()
    }

    /// The open interrupt, while one is waiting for an answer
    pub fn interrupt(&self) -> Option<&InterruptContext> {
        self.conversation.interrupt()
    }

    pub fn progress(&self) -> u32 {
        self.conversation.progress()
    }

    pub fn current_season(&self) -> Option<&str> {
        self.conversation.current_season()
    }

    pub fn log(&self) -> &MessageLog {
        self.conversation.log()
    }

    /// Get a cloneable handle for aborting or awaiting from other tasks.
    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Start a new turn with a user message
    ///
    /// Returns the state the conversation is left in once the session
    /// closes: `Idle`, or `AwaitingHumanInput` if the service paused.
    pub async fn submit_message(&mut self, text: &str) -> Result<StreamState> {
        let state = self.conversation.state;
        if state != StreamState::Idle {
            return Err(PreconditionError::NotIdle { state }.into());
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(PreconditionError::EmptyMessage.into());
        }

        self.set_progress(0);
        self.append(LogEntry::new(EntryKind::User, text));

        let request = StreamRequest::start(text, self.conversation.id.clone());
        Ok(self.run_session(request).await)
    }

    /// Answer the open interrupt and resume the paused turn
    pub async fn submit_answer(&mut self, answer: Answer) -> Result<StreamState> {
        let state = self.conversation.state;
        if state != StreamState::AwaitingHumanInput {
            return Err(PreconditionError::NotAwaitingInput { state }.into());
        }
        let context = self
            .conversation
            .interrupt
            .as_ref()
            .ok_or(PreconditionError::NoInterrupt)?;
        let conversation_id = self
            .conversation
            .id
            .clone()
            .ok_or(PreconditionError::NoConversation)?;
        let resolved = context.resolve(&answer)?;

        self.conversation.interrupt = None;
        self.append(LogEntry::new(EntryKind::User, resolved.label));

        let request = StreamRequest::resume(conversation_id, resolved.value);
        Ok(self.run_session(request).await)
    }

    /// Open one session and fold its events until it ends
    async fn run_session(&mut self, request: StreamRequest) -> StreamState {
        let cancel = self.handle.reset_cancel();
        self.set_state(StreamState::Streaming);
        self.handle.set_busy(true);

        match self.transport.open(request, cancel.clone()).await {
            Ok(mut events) => {
                while let Some(item) = events.next().await {
                    let flow = match item {
                        Ok(event) => self.fold(event),
                        Err(e) => {
                            self.fail(format!("Connection lost: {}", e));
                            Flow::Stop
                        }
                    };
                    if flow == Flow::Stop {
                        tracing::debug!("Closing session after error; later frames ignored");
                        break;
                    }
                }
            }
            Err(wander_proto::Error::Aborted) => {}
            Err(e) => self.fail(format!("Could not reach the planner: {}", e)),
        }

        if self.conversation.state == StreamState::Streaming {
            if cancel.is_cancelled() {
                tracing::info!("Session aborted");
            }
            self.set_state(StreamState::Idle);
        }
        self.handle.set_busy(false);
        self.conversation.state
    }

    /// Fold one event into conversation state and the log
    fn fold(&mut self, event: Event) -> Flow {
        if let Some(id) = &event.conversation_id {
            self.bind_conversation(id);
        }

        match event.kind {
            EventKind::System(narration) | EventKind::Message(narration) => {
                self.record_narration(narration);
                Flow::Continue
            }
            EventKind::Step(update) => {
                if let Some(season) = update.season() {
                    self.observe_season(season.to_string());
                }
                self.record_progress(Stage::Step, update);
                Flow::Continue
            }
            EventKind::Research(update) => {
                self.record_progress(Stage::Research, update);
                Flow::Continue
            }
            EventKind::Analysis(update) => {
                self.record_progress(Stage::Analysis, update);
                Flow::Continue
            }
            EventKind::Season(update) => {
                self.record_progress(Stage::Season, update);
                Flow::Continue
            }
            EventKind::Planning(update) => {
                self.record_progress(Stage::Planning, update);
                Flow::Continue
            }
            EventKind::Interrupt(request) => {
                let context = InterruptContext::from(request);
                if context.kind == InterruptKind::DestinationSelection && context.options.is_empty()
                {
                    self.fail("The planner asked for a destination but offered no options".into());
                    return Flow::Stop;
                }
                if self.conversation.id.is_none() {
                    self.fail("The planner paused without naming the conversation".into());
                    return Flow::Stop;
                }
                self.append(
                    LogEntry::new(EntryKind::Interrupt, context.prompt.clone())
                        .with_data(Some(event.raw)),
                );
                self.conversation.interrupt = Some(context);
                self.set_state(StreamState::AwaitingHumanInput);
                Flow::Continue
            }
            EventKind::Resume => {
                tracing::debug!("Resume acknowledged");
                Flow::Continue
            }
            EventKind::Result(ready) => {
                self.record_result(ready, event.raw);
                Flow::Continue
            }
            EventKind::Complete => {
                tracing::debug!("Turn complete");
                Flow::Continue
            }
            EventKind::Error(failure) => {
                let message = failure
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "The planner reported an error".to_string());
                self.fail(message);
                Flow::Stop
            }
        }
    }

    fn bind_conversation(&mut self, id: &ConversationId) {
        if self.conversation.bind_id(id) {
            tracing::info!(conversation_id = %id, "Conversation bound");
            let _ = self.event_tx.send(ControllerEvent::ConversationBound {
                conversation_id: id.clone(),
            });
        }
    }

    fn record_narration(&mut self, narration: Narration) {
        if narration.content.trim().is_empty() {
            return;
        }
        if self.config.is_bootstrap(&narration.content) {
            tracing::debug!(content = %narration.content, "Suppressing bootstrap narration");
            return;
        }
        self.append(LogEntry::new(EntryKind::AgentMessage, narration.content));
    }

    fn record_progress(&mut self, stage: Stage, update: StepUpdate) {
        self.set_progress((self.conversation.progress + 1).min(MAX_PROGRESS));
        self.append(
            LogEntry::new(EntryKind::ProgressStep, update.content)
                .with_step(stage, update.step)
                .with_data(update.data),
        );
    }

    fn record_result(&mut self, ready: ItineraryReady, raw: serde_json::Value) {
        self.set_progress(MAX_PROGRESS);
        let content = ready
            .content
            .unwrap_or_else(|| "Your itinerary is ready".to_string());
        let mut entry = LogEntry::new(EntryKind::Result, content).with_data(Some(raw));
        entry.step = ready.step;
        self.append(entry);
        self.conversation.interrupt = None;
        self.set_state(StreamState::Idle);
    }

    fn observe_season(&mut self, season: String) {
        if self.conversation.current_season.as_deref() != Some(season.as_str()) {
            self.conversation.current_season = Some(season.clone());
            let _ = self.event_tx.send(ControllerEvent::SeasonObserved { season });
        }
    }

    /// Surface a failure and end the turn
    fn fail(&mut self, message: String) {
        tracing::warn!(error = %message, "Turn failed");
        self.append(LogEntry::new(EntryKind::Error, message));
        self.conversation.interrupt = None;
        self.set_state(StreamState::Failed);
        self.set_state(StreamState::Idle);
        self.handle.set_busy(false);
    }

    fn append(&mut self, entry: LogEntry) {
        let entry = self.conversation.log.append(entry).clone();
        let _ = self.event_tx.send(ControllerEvent::EntryAppended { entry });
    }

    fn set_state(&mut self, to: StreamState) {
        let from = self.conversation.state;
        if from == to {
            return;
        }
        tracing::debug!(%from, %to, "State transition");
        self.conversation.state = to;
        let _ = self.event_tx.send(ControllerEvent::StateChanged { from, to });
    }

    fn set_progress(&mut self, completed: u32) {
        if self.conversation.progress == completed {
            return;
        }
        self.conversation.progress = completed;
        let _ = self.event_tx.send(ControllerEvent::Progress {
            completed,
            total: MAX_PROGRESS,
        });
    }
}
