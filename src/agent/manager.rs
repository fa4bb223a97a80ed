use std::sync::Arc;

use log::{debug, error, info};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::agent::binding::Agent;
use crate::agent::classify::{self, Diagnostic};
use crate::agent::config::{ApiEnvironment, BearerToken};
use crate::agent::providers::{AgentTransport, TransportError};
use crate::agent::request::{self, RequestError};
use crate::agent::session::{ChatEntry, ConversationSession};

/// Results sent back from a request task.
///
/// Each event carries the epoch of the session that issued the request so
/// that replies arriving after an agent switch can be recognised and
/// dropped.
#[derive(Debug)]
pub enum AgentEvent {
    /// The API answered with a JSON body.
    Reply { epoch: u64, body: Value },
    /// The call did not produce a JSON body.
    Failed { epoch: u64, error: TransportError },
}

/// Reasons a send is refused before anything is appended or posted.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// A reply to the previous turn is still pending. Overlapping sends
    /// are rejected rather than queued.
    #[error("the agent is still composing a reply")]
    Busy,
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// What applying one event did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Bot entries were appended.
    Replied {
        appended: usize,
        diagnostics: Vec<Diagnostic>,
    },
    /// The call failed and a failure entry was appended.
    Failed(TransportError),
}

impl SessionUpdate {
    /// Whether the reply body could not be read as a list of items.
    pub fn is_malformed(&self) -> bool {
        match self {
            SessionUpdate::Replied { diagnostics, .. } => {
                diagnostics.iter().any(Diagnostic::is_malformed)
            }
            SessionUpdate::Failed(_) => false,
        }
    }
}

/// Drives one conversation at a time against the remote agent API.
///
/// `ChatEngine` is responsible for:
/// - Building the request from the session and appending the user turn.
/// - Running the call on a tokio task and receiving its result over a channel.
/// - Classifying replies into bot entries and clearing the composing flag on
///   success, failure, or agent switch.
pub struct ChatEngine<T: AgentTransport> {
    session: ConversationSession,
    env: ApiEnvironment,
    token: BearerToken,
    transport: Arc<T>,
    /// Bumped on every agent switch.
    epoch: u64,
    in_flight: Option<JoinHandle<()>>,
    events_tx: UnboundedSender<AgentEvent>,
    events_rx: UnboundedReceiver<AgentEvent>,
}

impl<T: AgentTransport> ChatEngine<T> {
    pub fn new(agent: Agent, env: ApiEnvironment, token: BearerToken, transport: T) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        log_selection(&agent);
        Self {
            session: ConversationSession::new(agent),
            env,
            token,
            transport: Arc::new(transport),
            epoch: 0,
            in_flight: None,
            events_tx: tx,
            events_rx: rx,
        }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    pub fn is_composing(&self) -> bool {
        self.session.is_composing()
    }

    /// The last `count` entries of the log.
    pub fn latest(&self, count: usize) -> &[ChatEntry] {
        let entries = self.session.entries();
        &entries[entries.len().saturating_sub(count)..]
    }

    /// Sends `utterance` to the selected agent.
    ///
    /// On success the user entry is in the log, the session is composing
    /// and the call runs in the background; collect its outcome with
    /// [`ChatEngine::next_update`] or [`ChatEngine::poll_update`]. Must be
    /// called from within a tokio runtime.
    pub fn send(&mut self, utterance: &str) -> Result<(), SendError> {
        if self.session.is_composing() {
            return Err(SendError::Busy);
        }
        let request = request::build(&self.session, utterance, &self.env)?;
        self.session.append_user(utterance);
        debug!(
            "Sending turn {} to {} via {}",
            self.session.entries().len(),
            self.session.agent().name,
            self.transport.name()
        );

        let tx = self.events_tx.clone();
        let transport = Arc::clone(&self.transport);
        let token = self.token.clone();
        let epoch = self.epoch;
        self.in_flight = Some(tokio::spawn(async move {
            let mut guard = CompletionGuard::new(tx, epoch);
            let event = match transport.post(&request, &token).await {
                Ok(body) => AgentEvent::Reply { epoch, body },
                Err(error) => AgentEvent::Failed { epoch, error },
            };
            guard.finish(event);
        }));
        Ok(())
    }

    /// Waits for the pending call to finish and applies its outcome.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            let event = if self.session.is_composing() {
                self.events_rx.recv().await?
            } else {
                self.events_rx.try_recv().ok()?
            };
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
    }

    /// Non-blocking variant of [`ChatEngine::next_update`].
    pub fn poll_update(&mut self) -> Option<SessionUpdate> {
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
        None
    }

    /// Switches to `agent`, cancelling any pending call and starting an
    /// empty conversation.
    pub fn select_agent(&mut self, agent: Agent) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.epoch += 1;
        log_selection(&agent);
        self.session.reset(agent);
    }

    fn apply(&mut self, event: AgentEvent) -> Option<SessionUpdate> {
        match event {
            AgentEvent::Reply { epoch, .. } | AgentEvent::Failed { epoch, .. }
                if epoch != self.epoch =>
            {
                debug!("Dropping result from a previous conversation (epoch {epoch})");
                None
            }
            AgentEvent::Reply { body, .. } => {
                self.in_flight = None;
                let classification = classify::classify(&body);
                let appended = self.session.append_bot(classification.entries);
                debug!("Appended {appended} entries from reply");
                Some(SessionUpdate::Replied {
                    appended,
                    diagnostics: classification.diagnostics,
                })
            }
            AgentEvent::Failed { error, .. } => {
                self.in_flight = None;
                error!("Error posting to agent API: {error}");
                self.session.append_failure(error.to_string());
                Some(SessionUpdate::Failed(error))
            }
        }
    }
}

fn log_selection(agent: &Agent) {
    info!(
        "Agent selected: {} (type: {}, {})",
        agent.name,
        agent.binding.kind(),
        agent.binding.describe()
    );
}

/// Guarantees one event per request task.
///
/// If the task unwinds or is dropped before [`CompletionGuard::finish`], an
/// `Interrupted` failure is sent instead, so the composing flag always
/// clears. After an abort the epoch is already stale and the event is
/// dropped on receipt.
struct CompletionGuard {
    tx: UnboundedSender<AgentEvent>,
    epoch: u64,
    done: bool,
}

impl CompletionGuard {
    fn new(tx: UnboundedSender<AgentEvent>, epoch: u64) -> Self {
        Self {
            tx,
            epoch,
            done: false,
        }
    }

    fn finish(&mut self, event: AgentEvent) {
        self.done = true;
        let _ = self.tx.send(event);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.tx.send(AgentEvent::Failed {
                epoch: self.epoch,
                error: TransportError::Interrupted,
            });
        }
    }
}

impl<T: AgentTransport> Drop for ChatEngine<T> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
