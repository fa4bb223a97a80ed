//! Wire types for the conversational analytics API.
//!
//! Requests are plain serde structs. Replies are decoded by hand from
//! `serde_json::Value` because every field in a reply item is optional and
//! items of different kinds arrive in the same array.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Request ---

/// Body of one chat call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// `projects/<name>`.
    pub project: String,
    pub messages: Vec<RequestMessage>,
    pub context: RequestContext,
}

impl ChatRequest {
    /// Text of the single user message.
    pub fn user_text(&self) -> Option<&str> {
        self.messages
            .first()
            .map(|message| message.user_message.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub user_message: UserMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    pub datasource_references: DatasourceReferences,
}

/// Serialized as `{"looker": {...}}` or `{"bq": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasourceReferences {
    #[serde(rename = "looker")]
    Looker(LookerReferences),
    #[serde(rename = "bq")]
    BigQuery(BigQueryReferences),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookerReferences {
    pub explore_references: Vec<ExploreReference>,
    pub credentials: LookerCredentialsBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreReference {
    pub looker_instance_uri: String,
    pub lookml_model: String,
    pub explore: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookerCredentialsBlock {
    pub oauth: OAuthCredentials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    pub secret: OAuthSecret,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthSecret {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigQueryReferences {
    pub table_references: Vec<TableReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

// --- Reply ---

/// One facet of a reply item.
///
/// A single raw item may carry several facets (text and a chart, say), so
/// [`decode_item`] returns every facet it finds. Items with none of the
/// known facets decode to [`ResponseItem::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseItem {
    /// `systemMessage.text.parts`, string parts only.
    Text(Vec<String>),
    /// `systemMessage.chart.result.vegaConfig`.
    Chart(Value),
    /// Top-level `error`.
    Error(Value),
    /// `systemMessage.data.generatedLookerQuery` or `generatedSql`.
    QueryDebug(GeneratedQuery),
    Unknown(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedQuery {
    Looker(Value),
    Sql(String),
}

/// Decodes every recognised facet of one raw reply item, in the order
/// text, chart, error, query.
pub fn decode_item(raw: &Value) -> Vec<ResponseItem> {
    let mut facets = Vec::new();

    if let Some(parts) = present(raw, "/systemMessage/text/parts").and_then(Value::as_array) {
        let parts = parts
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        facets.push(ResponseItem::Text(parts));
    }
    if let Some(spec) = present(raw, "/systemMessage/chart/result/vegaConfig") {
        facets.push(ResponseItem::Chart(spec.clone()));
    }
    if let Some(error) = present(raw, "/error") {
        facets.push(ResponseItem::Error(error.clone()));
    }
    if let Some(query) = present(raw, "/systemMessage/data/generatedLookerQuery") {
        facets.push(ResponseItem::QueryDebug(GeneratedQuery::Looker(query.clone())));
    }
    if let Some(sql) = present(raw, "/systemMessage/data/generatedSql").and_then(Value::as_str) {
        facets.push(ResponseItem::QueryDebug(GeneratedQuery::Sql(sql.to_string())));
    }

    if facets.is_empty() {
        facets.push(ResponseItem::Unknown(raw.clone()));
    }
    facets
}

/// Looks up `pointer`, treating `null`, `false`, `0` and `""` as absent.
fn present<'a>(raw: &'a Value, pointer: &str) -> Option<&'a Value> {
    raw.pointer(pointer).filter(|value| is_truthy(value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
