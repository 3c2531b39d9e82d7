use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use mtx_sdk::Microtext;
use mtx_store::{ArrayOpKind, ArrayOpRequest, ArrayOpResult, FieldWrite, PageSnapshot};
use mtx_publish::{PublishOutcome, PublishStatus};
use mtx_tools::{tool_descriptors, PageSummary, ToolCall, ToolDescriptor};
use mtx_types::{ContentNode, FieldPath, PageId, Revision};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub microtext: Arc<Microtext>,
}

impl AppState {
    pub fn new(microtext: Arc<Microtext>) -> Self {
        Self { microtext }
    }

    /// Run blocking SDK work off the async workers.
    async fn blocking<T, F>(&self, f: F) -> ServerResult<T>
    where
        F: FnOnce(&Microtext) -> ServerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let microtext = self.microtext.clone();
        tokio::task::spawn_blocking(move || f(&microtext))
            .await
            .map_err(|e| ServerError::Internal(format!("spawn_blocking: {e}")))?
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

/// Parse an optional JSON body; an empty body is `None`.
fn optional_body<T: for<'de> Deserialize<'de>>(bytes: &Bytes) -> ServerResult<Option<T>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    let mt = &state.microtext;
    let config = mt.config();
    Json(json!({
        "name": "mtx-server",
        "version": env!("CARGO_PKG_VERSION"),
        "contentKey": config.content_key,
        "extension": config.extension,
        "publishing": mt.publishing_enabled(),
        "interpreter": mt.tools().has_interpreter(),
    }))
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

pub async fn pages_handler(State(state): State<AppState>) -> ServerResult<Json<Vec<PageSummary>>> {
    Ok(Json(state.microtext.tools().enumerate_pages().await?))
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    #[default]
    Tree,
    Flat,
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub page: String,
    #[serde(default)]
    pub format: ContentFormat,
}

pub async fn content_handler(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> ServerResult<Json<Value>> {
    let page = PageId::parse(&query.page)?;
    let value = match query.format {
        ContentFormat::Flat => to_json(state.microtext.tools().read_content(&page).await?)?,
        ContentFormat::Tree => {
            let snapshot: PageSnapshot = state
                .blocking(move |mt| Ok(mt.store().snapshot(&page)?))
                .await?;
            to_json(snapshot)?
        }
    };
    Ok(Json(value))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBody {
    pub page_id: String,
    pub path: String,
    pub value: String,
    #[serde(default)]
    pub expected_revision: Option<Revision>,
}

pub async fn field_handler(
    State(state): State<AppState>,
    payload: Result<Json<FieldBody>, JsonRejection>,
) -> ServerResult<Json<FieldWrite>> {
    let req = body(payload)?;
    let page = PageId::parse(&req.page_id)?;
    let path = FieldPath::parse(&req.path)?;
    let write = state
        .blocking(move |mt| {
            Ok(mt
                .store()
                .set_field_at(&page, &path, &req.value, req.expected_revision)?)
        })
        .await?;
    Ok(Json(write))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayBody {
    pub page_id: String,
    pub array_path: String,
    pub op: ArrayOpKind,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub template: Option<ContentNode>,
    #[serde(default)]
    pub expected_revision: Option<Revision>,
}

pub async fn array_handler(
    State(state): State<AppState>,
    payload: Result<Json<ArrayBody>, JsonRejection>,
) -> ServerResult<Json<ArrayOpResult>> {
    let req = body(payload)?;
    let request = ArrayOpRequest {
        page_id: PageId::parse(&req.page_id)?,
        array_path: FieldPath::parse(&req.array_path)?,
        op: req.op,
        index: req.index,
        template: req.template,
        expected_revision: req.expected_revision,
    };
    let result = state
        .blocking(move |mt| Ok(mt.array_op(&request)?))
        .await?;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PublishBody {
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn publish_handler(
    State(state): State<AppState>,
    bytes: Bytes,
) -> ServerResult<Json<PublishOutcome>> {
    let req: PublishBody = optional_body(&bytes)?.unwrap_or_default();
    let outcome = state
        .blocking(move |mt| Ok(mt.publish(req.message.as_deref())?))
        .await?;
    Ok(Json(outcome))
}

pub async fn publish_status_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<PublishStatus>> {
    let status = state.blocking(|mt| Ok(mt.publish_status()?)).await?;
    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

pub async fn tools_handler() -> Json<Vec<ToolDescriptor>> {
    Json(tool_descriptors())
}

pub async fn tool_call_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    bytes: Bytes,
) -> ServerResult<Json<Value>> {
    let arguments: Option<Value> = optional_body(&bytes)?;
    let call = ToolCall::from_parts(&name, arguments)?;
    Ok(Json(state.microtext.tools().dispatch(call).await?))
}

fn to_json<T: Serialize>(value: T) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(|e| ServerError::Internal(e.to_string()))
}
