//! Turns a raw reply into chat entries.
//!
//! Four independent passes run over the decoded items:
//! - text: every text part of every item, joined with single spaces,
//!   wrapped, and emitted as at most one entry;
//! - chart: one entry per chart, in item order, after the text entry;
//! - error: remote errors, reported as diagnostics only;
//! - query: generated Looker queries / SQL, reported as diagnostics only.

use log::{debug, error, info, warn};
use serde_json::Value;

use super::format::{self, DEFAULT_WIDTH};
use super::message::{GeneratedQuery, ResponseItem, decode_item};
use super::session::ChatEntry;

/// Observations about a reply that never become chat entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The reply body was not an array. Carries the JSON type that arrived.
    MalformedResponse(&'static str),
    /// An item's `error` field.
    RemoteError(Value),
    GeneratedQuery(GeneratedQuery),
    /// An item with no recognised facet.
    UnrecognizedItem(Value),
}

impl Diagnostic {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Diagnostic::MalformedResponse(_))
    }
}

/// Result of classifying one reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Entries to append, in order.
    pub entries: Vec<ChatEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Classification {
    pub fn is_malformed(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_malformed)
    }

    pub fn remote_errors(&self) -> impl Iterator<Item = &Value> {
        self.diagnostics.iter().filter_map(|diagnostic| match diagnostic {
            Diagnostic::RemoteError(error) => Some(error),
            _ => None,
        })
    }
}

/// Classifies `raw` with the default wrap width.
pub fn classify(raw: &Value) -> Classification {
    classify_with_width(raw, DEFAULT_WIDTH)
}

pub fn classify_with_width(raw: &Value, width: usize) -> Classification {
    let Some(items) = raw.as_array() else {
        let kind = json_kind(raw);
        error!("Invalid response format: expected an array, got {kind}");
        return Classification {
            entries: Vec::new(),
            diagnostics: vec![Diagnostic::MalformedResponse(kind)],
        };
    };

    let facets: Vec<ResponseItem> = items.iter().flat_map(decode_item).collect();
    let mut classification = Classification::default();

    let parts: Vec<&str> = facets
        .iter()
        .filter_map(|facet| match facet {
            ResponseItem::Text(parts) => Some(parts),
            _ => None,
        })
        .flatten()
        .map(String::as_str)
        .collect();
    let text = format::wrap(&parts.join(" "), width);
    if !text.is_empty() {
        classification.entries.push(ChatEntry::bot_text(text));
    }

    for facet in &facets {
        if let ResponseItem::Chart(spec) = facet {
            classification.entries.push(ChatEntry::chart(spec.clone()));
        }
    }

    for facet in &facets {
        if let ResponseItem::Error(remote) = facet {
            warn!("Agent reported an error: {remote}");
            classification
                .diagnostics
                .push(Diagnostic::RemoteError(remote.clone()));
        }
    }

    for facet in &facets {
        if let ResponseItem::QueryDebug(query) = facet {
            match query {
                GeneratedQuery::Looker(query) => info!("Generated Looker query: {query}"),
                GeneratedQuery::Sql(sql) => info!("Generated SQL: {sql}"),
            }
            classification
                .diagnostics
                .push(Diagnostic::GeneratedQuery(query.clone()));
        }
    }

    for facet in facets {
        if let ResponseItem::Unknown(item) = facet {
            debug!("Skipping unrecognised response item: {item}");
            classification
                .diagnostics
                .push(Diagnostic::UnrecognizedItem(item));
        }
    }

    classification
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::session::{EntryContent, Sender};
    use serde_json::json;

    fn text_item(parts: &[&str]) -> Value {
        json!({"systemMessage": {"text": {"parts": parts}}})
    }

    fn chart_item(spec: Value) -> Value {
        json!({"systemMessage": {"chart": {"result": {"vegaConfig": spec}}}})
    }

    #[test]
    fn chart_text_and_error_yield_text_then_chart() {
        let spec = json!({"mark": "bar", "data": {"values": [1, 2]}});
        let raw = json!([
            chart_item(spec.clone()),
            text_item(&["hello"]),
            {"error": {"message": "partial failure"}},
        ]);

        let result = classify(&raw);
        assert_eq!(
            result.entries,
            vec![ChatEntry::bot_text("hello"), ChatEntry::chart(spec)]
        );
        assert_eq!(
            result.remote_errors().collect::<Vec<_>>(),
            vec![&json!({"message": "partial failure"})]
        );
        assert!(!result.is_malformed());
    }

    #[test]
    fn text_parts_across_items_become_one_entry() {
        let raw = json!([text_item(&["Revenue", "grew"]), text_item(&["by 4%."])]);
        let result = classify(&raw);
        assert_eq!(result.entries, vec![ChatEntry::bot_text("Revenue grew by 4%.")]);
        assert_eq!(result.entries[0].sender, Sender::Bot);
    }

    #[test]
    fn aggregated_text_is_wrapped() {
        let raw = json!([text_item(&["aaa bbb", "ccc"])]);
        let result = classify_with_width(&raw, 7);
        assert_eq!(result.entries, vec![ChatEntry::bot_text("aaa bbb\nccc")]);
    }

    #[test]
    fn one_chart_entry_per_chart_item_in_order() {
        let raw = json!([
            chart_item(json!({"n": 1})),
            text_item(&["two charts"]),
            chart_item(json!({"n": 2})),
        ]);
        let result = classify(&raw);
        let charts: Vec<&Value> = result
            .entries
            .iter()
            .filter_map(|entry| match &entry.content {
                EntryContent::Chart(spec) => Some(spec),
                _ => None,
            })
            .collect();
        assert_eq!(charts, vec![&json!({"n": 1}), &json!({"n": 2})]);
        assert_eq!(result.entries[0].text(), Some("two charts"));
    }

    #[test]
    fn no_text_means_no_text_entry() {
        let raw = json!([chart_item(json!({})), text_item(&[])]);
        let result = classify(&raw);
        assert_eq!(result.entries.len(), 1);
        assert!(result.entries[0].is_chart());
    }

    #[test]
    fn non_array_reply_is_malformed_and_empty() {
        let result = classify(&json!({"systemMessage": {"text": {"parts": ["hi"]}}}));
        assert!(result.entries.is_empty());
        assert_eq!(result.diagnostics, vec![Diagnostic::MalformedResponse("object")]);
        assert!(result.is_malformed());

        assert!(classify(&Value::Null).is_malformed());
    }

    #[test]
    fn generated_queries_are_diagnostics_only() {
        let raw = json!([
            {"systemMessage": {"data": {"generatedLookerQuery": {"fields": ["orders.count"]}}}},
            {"systemMessage": {"data": {"generatedSql": "SELECT COUNT(*) FROM t"}}},
        ]);
        let result = classify(&raw);
        assert!(result.entries.is_empty());
        assert_eq!(
            result.diagnostics,
            vec![
                Diagnostic::GeneratedQuery(GeneratedQuery::Looker(
                    json!({"fields": ["orders.count"]})
                )),
                Diagnostic::GeneratedQuery(GeneratedQuery::Sql("SELECT COUNT(*) FROM t".into())),
            ]
        );
    }

    #[test]
    fn unknown_items_are_reported_not_dropped_silently() {
        let raw = json!([{"userMessage": {"text": "echo"}}, 7]);
        let result = classify(&raw);
        assert!(result.entries.is_empty());
        assert_eq!(
            result.diagnostics,
            vec![
                Diagnostic::UnrecognizedItem(json!({"userMessage": {"text": "echo"}})),
                Diagnostic::UnrecognizedItem(json!(7)),
            ]
        );
    }

    #[test]
    fn spacing_and_indentation_survive_aggregation() {
        let raw = json!([
            text_item(&["Total: "]),
            text_item(&["12 orders.  Top:\n  - widgets"]),
        ]);
        let result = classify(&raw);
        assert_eq!(
            result.entries[0].text(),
            Some("Total:  12 orders.  Top:\n  - widgets")
        );
    }

    #[test]
    fn short_text_round_trips_unwrapped() {
        let raw = json!([text_item(&["Total:"]), text_item(&["12 orders"])]);
        assert_eq!(
            classify(&raw).entries,
            vec![ChatEntry::bot_text("Total: 12 orders")]
        );
    }
}
