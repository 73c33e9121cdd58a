//! Wire types for the external NLU service and the client seam used to call it.
//!
//! Unknown fields are captured in `extra` maps so a response can be echoed back
//! to the caller with only `output.text` rewritten.

use async_trait::async_trait;
use brewline_core::errors::{ApplicationError, DEFAULT_UPSTREAM_STATUS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeIntent {
    pub intent: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEntity {
    pub entity: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RuntimeEntity {
    pub fn new(entity: impl Into<String>, value: impl Into<String>) -> Self {
        Self { entity: entity.into(), value: value.into(), extra: Map::new() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub intents: Vec<RuntimeIntent>,
    #[serde(default)]
    pub entities: Vec<RuntimeEntity>,
    #[serde(default)]
    pub output: MessageOutput,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageResponse {
    /// The highest-ranked intent, as ordered by the service.
    pub fn top_intent(&self) -> Option<&str> {
        self.intents.first().map(|intent| intent.intent.as_str())
    }
}

/// Payload sent to the NLU service. The workspace id addresses the call and
/// is not part of the body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageRequest {
    #[serde(skip)]
    pub workspace_id: String,
    pub input: Value,
    pub context: Value,
}

impl MessageRequest {
    pub fn new(
        workspace_id: impl Into<String>,
        input: Option<Value>,
        context: Option<Value>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            input: input.unwrap_or_else(|| Value::Object(Map::new())),
            context: context.unwrap_or_else(|| Value::Object(Map::new())),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum NluError {
    #[error("nlu service returned status {status}")]
    Status { status: u16, body: Value },
    #[error("nlu transport failure: {0}")]
    Transport(String),
    #[error("nlu response could not be decoded: {0}")]
    Decode(String),
}

impl NluError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Status { status, .. } => *status,
            Self::Transport(_) | Self::Decode(_) => DEFAULT_UPSTREAM_STATUS,
        }
    }

    pub fn into_application(self) -> ApplicationError {
        let status = self.status_code();
        ApplicationError::Upstream { status, message: self.to_string() }
    }
}

#[async_trait]
pub trait NluClient: Send + Sync {
    async fn message(&self, request: &MessageRequest) -> Result<MessageResponse, NluError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MessageRequest, MessageResponse, NluError};

    #[test]
    fn response_round_trips_unknown_fields() {
        let raw = json!({
            "intents": [{ "intent": "order", "confidence": 0.93 }],
            "entities": [{ "entity": "drink", "value": "latte", "location": [6, 11] }],
            "input": { "text": "one latte" },
            "output": { "text": ["{0}"], "nodes_visited": ["node_1"] },
            "context": { "conversation_id": "abc" },
            "alternate_intents": false
        });

        let response: MessageResponse = serde_json::from_value(raw.clone()).expect("decode");
        assert_eq!(response.top_intent(), Some("order"));
        assert_eq!(response.entities[0].value, "latte");
        assert_eq!(response.output.text.as_deref(), Some(&["{0}".to_string()][..]));

        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(encoded, raw);
    }

    #[test]
    fn sparse_response_uses_defaults() {
        let response: MessageResponse = serde_json::from_value(json!({})).expect("decode");
        assert_eq!(response.top_intent(), None);
        assert!(response.entities.is_empty());
        assert_eq!(response.output.text, None);
    }

    #[test]
    fn request_defaults_to_empty_objects_and_hides_workspace() {
        let request = MessageRequest::new("ws-1", None, Some(json!({ "turn": 2 })));
        let body = serde_json::to_value(&request).expect("encode");
        assert_eq!(body, json!({ "input": {}, "context": { "turn": 2 } }));
        assert_eq!(request.workspace_id, "ws-1");
    }

    #[test]
    fn errors_carry_upstream_status() {
        let error = NluError::Status { status: 401, body: json!({ "error": "Unauthorized" }) };
        assert_eq!(error.status_code(), 401);
        assert_eq!(NluError::Transport("reset".to_string()).status_code(), 500);

        let application = error.into_application();
        assert!(matches!(
            application,
            brewline_core::ApplicationError::Upstream { status: 401, .. }
        ));
    }
}
