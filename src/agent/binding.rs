use serde::{Deserialize, Serialize};

/// A named agent from the catalog: the display name plus the data source it
/// is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Name shown in the agent list.
    pub name: String,
    /// The data source binding.
    pub binding: AgentBinding,
}

impl Agent {
    /// Creates an agent named `name` bound to `binding`.
    pub fn new(name: impl Into<String>, binding: AgentBinding) -> Self {
        Self {
            name: name.into(),
            binding,
        }
    }

    /// Instructions sent as the request's system instruction, if any.
    pub fn system_instructions(&self) -> Option<&str> {
        self.binding.system_instructions()
    }
}

/// The data source an agent queries against.
///
/// The catalog `type` field selects the variant. Only the fields of the
/// selected variant exist, so a request can never carry both reference kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentBinding {
    /// A Looker explore.
    Looker(LookerAgent),
    /// A BigQuery table.
    Bigquery(BigQueryAgent),
}

impl AgentBinding {
    /// The catalog spelling of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentBinding::Looker(_) => "looker",
            AgentBinding::Bigquery(_) => "bigquery",
        }
    }

    pub fn system_instructions(&self) -> Option<&str> {
        match self {
            AgentBinding::Looker(agent) => agent.system_instructions.as_deref(),
            AgentBinding::Bigquery(agent) => agent.system_instructions.as_deref(),
        }
    }

    /// Short description of the bound source, used in logs and the agent list.
    pub fn describe(&self) -> String {
        match self {
            AgentBinding::Looker(agent) => format!("explore {}::{}", agent.model, agent.explore),
            AgentBinding::Bigquery(agent) => {
                format!("table {}.{}", agent.dataset_id, agent.table_id)
            }
        }
    }
}

/// A Looker explore on the configured instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookerAgent {
    /// LookML model name.
    pub model: String,
    /// Explore within the model.
    pub explore: String,
    /// Free-form guidance for the agent.
    #[serde(default)]
    pub system_instructions: Option<String>,
}

/// A BigQuery table in the configured project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigQueryAgent {
    /// Dataset holding the table.
    pub dataset_id: String,
    /// Table the agent answers questions about.
    pub table_id: String,
    /// Free-form guidance for the agent.
    #[serde(default)]
    pub system_instructions: Option<String>,
}
