//! Agent catalog loading.
//!
//! The catalog is a YAML document listing agents in display order:
//!
//! ```yaml
//! agents:
//!   - Sales Explorer:
//!       type: looker
//!       model: thelook
//!       explore: order_items
//!       system_instructions: Answer as a sales analyst.
//!   - Web Traffic:
//!       type: bigquery
//!       dataset_id: analytics
//!       table_id: sessions
//! ```
//!
//! This is the only place an unknown agent `type` can show up. Past this
//! point an [`AgentBinding`] is a closed enum.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::binding::{Agent, AgentBinding};

/// Failures while reading the catalog document.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read agent catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse agent catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("agent catalog entry is not a name -> settings map")]
    MalformedEntry,
    #[error("agent '{agent}' has no type")]
    MissingKind { agent: String },
    #[error("agent '{agent}' has unsupported type '{kind}' (expected looker or bigquery)")]
    UnsupportedAgentKind { agent: String, kind: String },
    #[error("agent '{agent}' is invalid: {source}")]
    InvalidAgent {
        agent: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    agents: Vec<Mapping>,
}

/// The ordered list of configured agents.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: Vec<Agent>,
}

impl AgentCatalog {
    /// Reads and parses the catalog at `path`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&raw)?;
        debug!(
            "Loaded {} agent(s) from {}",
            catalog.agents.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_yaml::from_str(raw)?;
        let mut agents = Vec::new();
        for entry in document.agents {
            for (name, settings) in entry {
                let name = name.as_str().ok_or(CatalogError::MalformedEntry)?.to_string();
                agents.push(parse_agent(name, settings)?);
            }
        }
        Ok(Self { agents })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The agent selected when the catalog is first shown.
    pub fn first(&self) -> Option<&Agent> {
        self.agents.first()
    }

    pub fn find(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

fn parse_agent(name: String, settings: Value) -> Result<Agent, CatalogError> {
    let kind = match settings.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(_) | None => return Err(CatalogError::MissingKind { agent: name }),
    };
    if !matches!(kind.as_str(), "looker" | "bigquery") {
        return Err(CatalogError::UnsupportedAgentKind { agent: name, kind });
    }
    match serde_yaml::from_value::<AgentBinding>(settings) {
        Ok(binding) => Ok(Agent::new(name, binding)),
        Err(source) => Err(CatalogError::InvalidAgent {
            agent: name,
            source,
        }),
    }
}
