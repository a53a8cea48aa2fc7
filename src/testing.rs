//! Local stand-ins for the generation API and the image host, used by unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::ApiConfig;
use crate::constants::DOWNLOAD_TIMEOUT;

/// What the stub saw on one generation call.
#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    pub(crate) authorization: Option<String>,
    pub(crate) organization: Option<String>,
    pub(crate) body: Value,
}

#[derive(Clone)]
struct StubState {
    base: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Stub server. Prompt prefixes steer it:
/// `fail` answers 500, `empty` answers with no images, `missing` yields a URL that 404s.
/// Every other prompt gets a URL serving `image-<stub_file_name(prompt)>`.
pub(crate) struct StubApi {
    base: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl StubApi {
    pub(crate) fn api_config(&self) -> ApiConfig {
        ApiConfig {
            api_key: "sk-test".to_string(),
            organization: Some("org-test".to_string()),
            base_url: self.api_base(),
            model: "dall-e-3".to_string(),
        }
    }

    pub(crate) fn api_base(&self) -> Url {
        Url::parse(&format!("{}/v1", self.base)).expect("stub base url")
    }

    pub(crate) fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base, name)
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) async fn spawn_stub_api() -> StubApi {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let base = format!("http://{}", listener.local_addr().expect("stub address"));
    let state = StubState {
        base: base.clone(),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let requests = state.requests.clone();
    let app = Router::new()
        .route("/v1/images/generations", post(generations_handler))
        .route("/files/{name}", get(file_handler))
        .with_state(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    StubApi {
        base,
        requests,
        handle,
    }
}

async fn generations_handler(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            authorization: header("authorization"),
            organization: header("openai-organization"),
            body: body.clone(),
        });

    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    if prompt.starts_with("fail") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "upstream exploded" } })),
        );
    }
    if prompt.starts_with("empty") {
        return (StatusCode::OK, Json(json!({ "created": 0, "data": [] })));
    }
    let name = if prompt.starts_with("missing") {
        "missing".to_string()
    } else {
        stub_file_name(&prompt)
    };
    (
        StatusCode::OK,
        Json(json!({
            "created": 0,
            "data": [{ "url": format!("{}/files/{}", state.base, name), "revised_prompt": prompt }]
        })),
    )
}

/// File name the stub answers only after the download timeout has passed.
pub(crate) const SLOW_FILE: &str = "slow";

async fn file_handler(Path(name): Path<String>) -> impl IntoResponse {
    if name == SLOW_FILE {
        tokio::time::sleep(DOWNLOAD_TIMEOUT + Duration::from_secs(5)).await;
    }
    if name == "missing" {
        return (StatusCode::NOT_FOUND, "not here".to_string());
    }
    (StatusCode::OK, format!("image-{name}"))
}

/// URL-safe and unique per prompt: non-alphanumerics become `x<hex code point>`.
pub(crate) fn stub_file_name(prompt: &str) -> String {
    prompt
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_string()
            } else {
                format!("x{:x}", u32::from(c))
            }
        })
        .collect()
}

/// A URL nothing is listening on.
pub(crate) async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("throwaway address");
    drop(listener);
    format!("http://{addr}/files/gone")
}
