//! Builds the request body for one chat turn.
//!
//! The API receives a single user message per call. Earlier turns are
//! flattened into that message as a JSON transcript, followed by the new
//! utterance.

use serde::Serialize;

use super::binding::AgentBinding;
use super::config::ApiEnvironment;
use super::message::{
    BigQueryReferences, ChatRequest, DatasourceReferences, ExploreReference,
    LookerCredentialsBlock, LookerReferences, OAuthCredentials, OAuthSecret, RequestContext,
    RequestMessage, TableReference, UserMessage,
};
use super::session::{ChatEntry, ConversationSession, Sender};

pub const TRANSCRIPT_PREAMBLE: &str = "These are the previous messages in our conversation so far:";
pub const NEXT_MESSAGE_HEADER: &str = "My next message:";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("message cannot be empty")]
    EmptyUtterance,
    #[error("agent '{agent}' needs the Looker instance url, client id and client secret")]
    MissingLookerSettings { agent: String },
    #[error("failed to serialize conversation transcript: {0}")]
    Transcript(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct TranscriptTurn<'a> {
    sender: Sender,
    text: &'a str,
}

/// Serializes the text entries of `entries` as a pretty JSON array of
/// `{sender, text}`. Charts, failures and empty texts are left out.
pub fn transcript(entries: &[ChatEntry]) -> Result<String, serde_json::Error> {
    let turns: Vec<TranscriptTurn<'_>> = entries
        .iter()
        .filter_map(|entry| {
            entry
                .text()
                .filter(|text| !text.is_empty())
                .map(|text| TranscriptTurn {
                    sender: entry.sender,
                    text,
                })
        })
        .collect();
    serde_json::to_string_pretty(&turns)
}

/// Produces the request for `utterance` given the conversation so far.
///
/// `session` must not yet contain `utterance`; the caller appends the user
/// entry after the request is built.
pub fn build(
    session: &ConversationSession,
    utterance: &str,
    env: &ApiEnvironment,
) -> Result<ChatRequest, RequestError> {
    if utterance.trim().is_empty() {
        return Err(RequestError::EmptyUtterance);
    }

    let history = transcript(session.entries())?;
    let text = format!("{TRANSCRIPT_PREAMBLE}\n{history}\n{NEXT_MESSAGE_HEADER}\n{utterance}");

    let agent = session.agent();
    let datasource_references = match &agent.binding {
        AgentBinding::Looker(looker) => {
            let credentials =
                env.looker
                    .as_ref()
                    .ok_or_else(|| RequestError::MissingLookerSettings {
                        agent: agent.name.clone(),
                    })?;
            DatasourceReferences::Looker(LookerReferences {
                explore_references: vec![ExploreReference {
                    looker_instance_uri: credentials.instance_url.clone(),
                    lookml_model: looker.model.clone(),
                    explore: looker.explore.clone(),
                }],
                credentials: LookerCredentialsBlock {
                    oauth: OAuthCredentials {
                        secret: OAuthSecret {
                            client_id: credentials.client_id.clone(),
                            client_secret: credentials.client_secret.clone(),
                        },
                    },
                },
            })
        }
        AgentBinding::Bigquery(bigquery) => DatasourceReferences::BigQuery(BigQueryReferences {
            table_references: vec![TableReference {
                project_id: env.project_name.clone(),
                dataset_id: bigquery.dataset_id.clone(),
                table_id: bigquery.table_id.clone(),
            }],
        }),
    };

    Ok(ChatRequest {
        project: env.project_resource(),
        messages: vec![RequestMessage {
            user_message: UserMessage { text },
        }],
        context: RequestContext {
            system_instruction: agent.system_instructions().map(str::to_string),
            datasource_references,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::binding::{Agent, BigQueryAgent, LookerAgent};
    use crate::agent::config::LookerCredentials;
    use serde_json::{Value, json};

    fn env() -> ApiEnvironment {
        ApiEnvironment {
            endpoint: "https://api.test/chat".into(),
            project_name: "demo".into(),
            looker: Some(LookerCredentials {
                instance_url: "https://looker.test".into(),
                client_id: "client".into(),
                client_secret: "secret".into(),
            }),
            timeout: None,
        }
    }

    fn looker_session() -> ConversationSession {
        ConversationSession::new(Agent::new(
            "Sales",
            AgentBinding::Looker(LookerAgent {
                model: "thelook".into(),
                explore: "order_items".into(),
                system_instructions: Some("Be brief.".into()),
            }),
        ))
    }

    fn bigquery_session() -> ConversationSession {
        ConversationSession::new(Agent::new(
            "Traffic",
            AgentBinding::Bigquery(BigQueryAgent {
                dataset_id: "web".into(),
                table_id: "sessions".into(),
                system_instructions: None,
            }),
        ))
    }

    /// Pulls the transcript array back out of the flattened user text.
    fn embedded_transcript(text: &str) -> Value {
        let start = text.find(TRANSCRIPT_PREAMBLE).unwrap() + TRANSCRIPT_PREAMBLE.len();
        let end = text.rfind(NEXT_MESSAGE_HEADER).unwrap();
        serde_json::from_str(text[start..end].trim()).unwrap()
    }

    #[test]
    fn transcript_keeps_text_turns_in_order_and_drops_charts() {
        let mut session = looker_session();
        session.append_user("top products?");
        session.append_bot(vec![
            ChatEntry::bot_text("Widgets lead."),
            ChatEntry::chart(json!({"mark": "bar"})),
        ]);
        session.append_user("and by region?");
        session.append_failure("HTTP 500");

        let request = build(&session, "thanks", &env()).unwrap();
        let text = request.user_text().unwrap();

        assert_eq!(
            embedded_transcript(text),
            json!([
                {"sender": "user", "text": "top products?"},
                {"sender": "bot", "text": "Widgets lead."},
                {"sender": "user", "text": "and by region?"},
            ])
        );
        assert!(text.ends_with(&format!("{NEXT_MESSAGE_HEADER}\nthanks")));
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn first_turn_has_empty_transcript() {
        let request = build(&looker_session(), "hello", &env()).unwrap();
        assert_eq!(embedded_transcript(request.user_text().unwrap()), json!([]));
    }

    #[test]
    fn utterance_is_sent_verbatim() {
        let request = build(&looker_session(), "  padded  ", &env()).unwrap();
        assert!(request.user_text().unwrap().ends_with("\n  padded  "));
    }

    #[test]
    fn whitespace_utterance_is_rejected() {
        assert!(matches!(
            build(&looker_session(), " \n\t ", &env()),
            Err(RequestError::EmptyUtterance)
        ));
    }

    #[test]
    fn looker_payload_has_one_explore_reference() {
        let request = build(&looker_session(), "hi", &env()).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["project"], "projects/demo");
        assert_eq!(body["context"]["system_instruction"], "Be brief.");
        let refs = &body["context"]["datasource_references"];
        assert!(refs.get("bq").is_none());
        assert_eq!(
            refs["looker"]["explore_references"],
            json!([{
                "looker_instance_uri": "https://looker.test",
                "lookml_model": "thelook",
                "explore": "order_items",
            }])
        );
        assert_eq!(
            refs["looker"]["credentials"],
            json!({"oauth": {"secret": {"client_id": "client", "client_secret": "secret"}}})
        );
    }

    #[test]
    fn bigquery_payload_has_one_table_reference() {
        let request = build(&bigquery_session(), "hi", &env()).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        let refs = &body["context"]["datasource_references"];
        assert!(refs.get("looker").is_none());
        assert_eq!(
            refs["bq"]["table_references"],
            json!([{"project_id": "demo", "dataset_id": "web", "table_id": "sessions"}])
        );
        assert!(body["context"].get("system_instruction").is_none());
    }

    #[test]
    fn bearer_token_never_enters_the_body() {
        let request = build(&bigquery_session(), "hi", &env()).unwrap();
        let body = serde_json::to_string(&request).unwrap();
        assert!(!body.contains("Bearer"));
        assert!(!body.contains("Authorization"));
    }

    #[test]
    fn looker_agent_without_settings_fails_before_sending() {
        let mut env = env();
        env.looker = None;
        assert!(matches!(
            build(&looker_session(), "hi", &env),
            Err(RequestError::MissingLookerSettings { agent }) if agent == "Sales"
        ));
        // BigQuery agents do not need the Looker client.
        assert!(build(&bigquery_session(), "hi", &env).is_ok());
    }
}
