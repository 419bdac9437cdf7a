//! Test utilities for cadence-core
//!
//! Provides a mock OpenAI-compatible chat completions server with scripted
//! per-model behavior, for backend and orchestrator tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

/// How the mock server answers for a given model
#[derive(Debug, Clone)]
pub enum MockModelBehavior {
    /// 200 with this content
    Reply(String),
    /// 403 with a "not available in your region" envelope
    RegionBlocked,
    /// 500 with a raw text body
    ServerError,
    /// 200 whose content is only whitespace
    Blank,
}

/// A request the mock server received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub system: Option<String>,
    pub user: Option<String>,
    pub max_tokens: Option<u32>,
    pub authorization: Option<String>,
    pub title: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Default)]
struct ServerState {
    behaviors: HashMap<String, MockModelBehavior>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Builder for [`MockChatServer`]
#[derive(Default)]
pub struct MockChatServerBuilder {
    behaviors: HashMap<String, MockModelBehavior>,
}

impl MockChatServerBuilder {
    pub fn reply(mut self, model: &str, content: &str) -> Self {
        self.behaviors
            .insert(model.to_string(), MockModelBehavior::Reply(content.to_string()));
        self
    }

    pub fn region_blocked(mut self, model: &str) -> Self {
        self.behaviors
            .insert(model.to_string(), MockModelBehavior::RegionBlocked);
        self
    }

    pub fn server_error(mut self, model: &str) -> Self {
        self.behaviors
            .insert(model.to_string(), MockModelBehavior::ServerError);
        self
    }

    pub fn blank(mut self, model: &str) -> Self {
        self.behaviors
            .insert(model.to_string(), MockModelBehavior::Blank);
        self
    }

    /// Start the mock server on an available port
    pub async fn start(self) -> MockChatServer {
        let state = Arc::new(ServerState {
            behaviors: self.behaviors,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        MockChatServer {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }
}

/// Mock chat completions server
///
/// Models without a scripted behavior get a 404, like an unknown model id.
pub struct MockChatServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockChatServer {
    pub fn builder() -> MockChatServerBuilder {
        MockChatServerBuilder::default()
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    #[serde(default)]
    messages: Vec<ChatRequestMessage>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatRequestMessage {
    role: String,
    content: String,
}

async fn handle_models(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    let data: Vec<_> = state
        .behaviors
        .keys()
        .map(|id| json!({ "id": id, "object": "model" }))
        .collect();
    Json(json!({ "object": "list", "data": data }))
}

async fn handle_chat(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let message = |role: &str| {
        request
            .messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.clone())
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        model: request.model.clone(),
        system: message("system"),
        user: message("user"),
        max_tokens: request.max_tokens,
        authorization: header("authorization"),
        title: header("x-title"),
        user_agent: header("user-agent"),
    });

    match state.behaviors.get(&request.model) {
        Some(MockModelBehavior::Reply(content)) => completion(&request.model, content),
        Some(MockModelBehavior::Blank) => completion(&request.model, "   "),
        Some(MockModelBehavior::RegionBlocked) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": { "message": "This model is not available in your region." }
            })),
        )
            .into_response(),
        Some(MockModelBehavior::ServerError) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": { "message": format!("Model {} does not exist", request.model) }
            })),
        )
            .into_response(),
    }
}

fn completion(model: &str, content: &str) -> Response {
    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}
