//! Conversation engine for the analytics agents.
//!
//! This module holds everything between "the user typed a line" and "these
//! entries were appended to the chat": agent bindings, request building,
//! reply classification, the conversation log, and the transport seam.

/// `binding` module: the agent record and its Looker / BigQuery variants.
pub mod binding;

/// `catalog` module: loads the agent list from `agents.yaml`.
pub mod catalog;

/// `classify` module: splits a reply into chat entries and diagnostics.
pub mod classify;

/// `config` module: `config/chatter.toml`, environment lookups and credentials.
pub mod config;

/// `format` module: word wrap for bot text.
pub mod format;

/// `manager` module: `ChatEngine`, which runs sends and applies replies.
pub mod manager;

/// `message` module: request wire types and reply item decoding.
pub mod message;

/// `providers` module: the `AgentTransport` trait and its HTTP implementation.
pub mod providers;

/// `request` module: builds the request for one turn.
pub mod request;

/// `session` module: the ordered chat log and composing flag.
pub mod session;

pub use binding::{Agent, AgentBinding, BigQueryAgent, LookerAgent};
pub use catalog::{AgentCatalog, CatalogError};
pub use classify::{Classification, Diagnostic, classify};
pub use config::{ApiEnvironment, BearerToken, ChatterSettings, LookerCredentials};
pub use manager::{AgentEvent, ChatEngine, SendError, SessionUpdate};
pub use message::ChatRequest;
pub use providers::{AgentTransport, TransportError};
pub use request::RequestError;
pub use session::{ChatEntry, ConversationSession, EntryContent, Sender};
