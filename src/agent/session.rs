use serde::Serialize;
use serde_json::Value;

use super::binding::Agent;

/// Who produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// The payload carried by one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryContent {
    /// Display text, already wrapped for monospace rendering.
    Text(String),
    /// Opaque chart specification handed to the chart renderer as-is.
    Chart(Value),
    /// A request that never produced a reply.
    Failure(String),
}

/// One unit in the conversation log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    /// Author of the entry.
    pub sender: Sender,
    /// What gets rendered.
    pub content: EntryContent,
}

impl ChatEntry {
    /// A user turn.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: EntryContent::Text(text.into()),
        }
    }

    /// A bot text reply.
    pub fn bot_text(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: EntryContent::Text(text.into()),
        }
    }

    /// A bot chart carrying `spec` untouched.
    pub fn chart(spec: Value) -> Self {
        Self {
            sender: Sender::Bot,
            content: EntryContent::Chart(spec),
        }
    }

    /// A bot entry for a call that failed.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: EntryContent::Failure(message.into()),
        }
    }

    /// The text payload, for text entries only.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            EntryContent::Text(text) => Some(text),
            EntryContent::Chart(_) | EntryContent::Failure(_) => None,
        }
    }

    /// Whether this entry is a chart.
    pub fn is_chart(&self) -> bool {
        matches!(self.content, EntryContent::Chart(_))
    }
}

/// The conversation with the selected agent.
///
/// Entries are only ever appended. Switching agents replaces the whole
/// session state through [`ConversationSession::reset`]; nothing carries
/// over between agents.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    agent: Agent,
    entries: Vec<ChatEntry>,
    composing: bool,
}

impl ConversationSession {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            entries: Vec::new(),
            composing: false,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The log in arrival order.
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Whether a reply is in flight.
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Records the user's turn and marks a reply as in flight.
    pub fn append_user(&mut self, text: impl Into<String>) {
        self.entries.push(ChatEntry::user_text(text));
        self.composing = true;
    }

    /// Appends the classified entries of one reply, in order, then clears
    /// the composing flag. Returns how many entries were appended.
    pub fn append_bot(&mut self, entries: impl IntoIterator<Item = ChatEntry>) -> usize {
        let before = self.entries.len();
        self.entries.extend(entries);
        self.composing = false;
        self.entries.len() - before
    }

    /// Ends an in-flight request that produced no reply.
    pub fn append_failure(&mut self, message: impl Into<String>) {
        self.entries.push(ChatEntry::failure(message));
        self.composing = false;
    }

    /// Starts over with `agent`: empty log, nothing in flight.
    pub fn reset(&mut self, agent: Agent) {
        self.agent = agent;
        self.entries.clear();
        self.composing = false;
    }
}
