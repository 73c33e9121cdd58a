//! HTTP surface of the ordering assistant.
//!
//! - `POST /api/message` forwards a turn to the NLU service and rewrites its reply
//! - `GET  /health` reports readiness of the inventory seed
//! - everything else falls through to the optional static UI directory

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use brewline_agent::nlu::{MessageRequest, NluClient, NluError};
use brewline_agent::runtime::AgentRuntime;
use brewline_core::errors::{ApplicationError, InterfaceError};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::services::ServeDir;
use tracing::{info, warn};
use uuid::Uuid;

use crate::health::{self, HealthState};

pub const CONFIGURATION_MISSING_MESSAGE: &str = "The app has not been configured with a \
<b>WORKSPACE_ID</b> environment variable. Please refer to the \
<a href=\"https://github.com/watson-developer-cloud/conversation-simple\">README</a> \
documentation on how to set this variable. <br>";

const CORRELATION_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct MessageState {
    pub runtime: Arc<AgentRuntime>,
    pub nlu: Arc<dyn NluClient>,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
}

pub fn router(state: MessageState, health_state: HealthState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/api/message", post(message))
        .with_state(state)
        .merge(Router::new().route("/health", get(health::health)).with_state(health_state));

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

pub async fn message(
    State(state): State<MessageState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = correlation_id(&headers);

    let Some(workspace_id) = state.workspace_id.as_deref() else {
        let missing = ApplicationError::ConfigurationMissing("nlu.workspace_id".to_string());
        warn!(
            event_name = "server.message.configuration_missing",
            correlation_id = %correlation_id,
            error = %missing,
            "turn received without a workspace id"
        );
        return Json(json!({ "output": { "text": CONFIGURATION_MISSING_MESSAGE } })).into_response();
    };

    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(reason) => {
            let error = InterfaceError::BadRequest { message: reason, correlation_id };
            return error_response(&error, None);
        }
    };

    let request = MessageRequest::new(workspace_id, payload.input, payload.context);
    let response = match state.nlu.message(&request).await {
        Ok(response) => response,
        Err(nlu_error) => {
            let upstream_body = match &nlu_error {
                NluError::Status { body, .. } if !body.is_null() => Some(body.clone()),
                _ => None,
            };
            let error = nlu_error.into_application().into_interface(correlation_id.as_str());
            warn!(
                event_name = "server.message.upstream_failed",
                correlation_id = %correlation_id,
                status = error.status_code(),
                error = %error,
                "nlu service call failed"
            );
            return error_response(&error, upstream_body);
        }
    };

    let handled = state.runtime.handle_turn(response, &correlation_id);
    info!(
        event_name = "server.message.handled",
        correlation_id = %correlation_id,
        outcome = ?handled.outcome,
        "turn handled"
    );
    Json(handled.response).into_response()
}

fn parse_payload(body: &[u8]) -> Result<MessagePayload, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(MessagePayload::default());
    }
    serde_json::from_slice(body).map_err(|error| format!("invalid message body: {error}"))
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// Upstream error bodies are relayed as-is so clients see the service's own error.
fn error_response(error: &InterfaceError, upstream_body: Option<Value>) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = upstream_body.unwrap_or_else(|| {
        json!({
            "error": error.user_message(),
            "code": error.status_code(),
            "correlation_id": error.correlation_id(),
        })
    });
    (status, Json(body)).into_response()
}
