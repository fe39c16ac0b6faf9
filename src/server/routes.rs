use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ApiState;
use crate::error::AppError;
use crate::manifest;
use crate::models::{
    Category, CaptureCreated, CategoryFilter, FewShotExample, RecordComponentInput,
    UploadCaptureInput,
};
use crate::prompt::{self, ComposeRequest, PromptMessage};

const CAPTURES_PREFIX: &str = "/api/captures/";
const REGISTRY_PREFIX: &str = "/api/registry/";
const RENDER_SUFFIX: &str = "/render";

/// An API operation resolved from `(method, path)`.
#[derive(Debug, PartialEq, Eq)]
enum Endpoint {
    GetSystemPrompt,
    PutSystemPrompt,
    GetExamples,
    PutExamples,
    ListCaptures,
    UploadCapture,
    DeleteCapture(String),
    ListComponents,
    RecordComponent,
    ComposePrompt,
    ListRegistry,
    RenderComponent(String),
}

/// Exact-match routing on the path; the query string is ignored.
fn route(method: &Method, path: &str) -> Option<Endpoint> {
    let endpoint = match (method, path) {
        (&Method::GET, "/api/prompts/system") => Endpoint::GetSystemPrompt,
        (&Method::PUT, "/api/prompts/system") => Endpoint::PutSystemPrompt,
        (&Method::GET, "/api/prompts/examples") => Endpoint::GetExamples,
        (&Method::PUT, "/api/prompts/examples") => Endpoint::PutExamples,
        (&Method::POST, "/api/prompts/compose") => Endpoint::ComposePrompt,
        (&Method::GET, "/api/captures") => Endpoint::ListCaptures,
        (&Method::POST, "/api/captures") => Endpoint::UploadCapture,
        (&Method::GET, "/api/components") => Endpoint::ListComponents,
        (&Method::POST, "/api/components") => Endpoint::RecordComponent,
        (&Method::GET, "/api/registry") => Endpoint::ListRegistry,
        (&Method::DELETE, p) if p.starts_with(CAPTURES_PREFIX) => {
            Endpoint::DeleteCapture(p[CAPTURES_PREFIX.len()..].to_string())
        }
        (&Method::POST, p) => {
            let name = p.strip_prefix(REGISTRY_PREFIX)?.strip_suffix(RENDER_SUFFIX)?;
            if name.is_empty() || name.contains('/') {
                return None;
            }
            Endpoint::RenderComponent(name.to_string())
        }
        _ => return None,
    };
    Some(endpoint)
}

/// Middleware: answer API requests, pass everything else to the static file service.
pub async fn dispatch(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match route(&method, &path) {
        Some(endpoint) => handle(&state, endpoint, req)
            .await
            .unwrap_or_else(IntoResponse::into_response),
        None => next.run(req).await,
    };

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn handle(state: &ApiState, endpoint: Endpoint, req: Request) -> Result<Response, AppError> {
    let store = &state.store;

    match endpoint {
        Endpoint::GetSystemPrompt => {
            let content = store.read_system_prompt().await?;
            Ok(Json(json!({ "content": content })).into_response())
        }
        Endpoint::PutSystemPrompt => {
            let body: SystemPromptBody = read_json(req).await?;
            let content = body
                .content
                .ok_or_else(|| AppError::Validation("Missing 'content' field".into()))?;
            store.write_system_prompt(&content).await?;
            Ok(ok())
        }
        Endpoint::GetExamples => {
            let raw = store.read_examples().await?;
            Ok(([(header::CONTENT_TYPE, "application/json")], raw).into_response())
        }
        Endpoint::PutExamples => {
            let bytes = read_body(req).await?;
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|_| AppError::Validation("Request body is not valid UTF-8".into()))?;
            store.write_examples(&text).await?;
            Ok(ok())
        }
        Endpoint::ListCaptures => Ok(Json(store.list_captures().await?).into_response()),
        Endpoint::UploadCapture => {
            let input: UploadCaptureInput = read_json(req).await?;
            let capture = store
                .save_capture(input.data.as_deref(), input.filename.as_deref())
                .await?;
            Ok(Json(CaptureCreated {
                ok: true,
                name: capture.name,
                url: capture.url,
            })
            .into_response())
        }
        Endpoint::DeleteCapture(name) => {
            store.delete_capture(&name).await?;
            Ok(ok())
        }
        Endpoint::ListComponents => {
            let Query(query) = Query::<ComponentsQuery>::try_from_uri(req.uri())
                .map_err(|e| AppError::Validation(e.body_text()))?;
            let entries = manifest::load(&state.manifest_path).await?;
            let entries = manifest::filter(entries, query.category.unwrap_or_default());
            Ok(Json(entries).into_response())
        }
        Endpoint::RecordComponent => {
            let input: RecordComponentInput = read_json(req).await?;
            let entry =
                manifest::record_generated(&state.components_dir, &state.manifest_path, input)
                    .await?;
            Ok(Json(entry).into_response())
        }
        Endpoint::ComposePrompt => {
            let body: ComposeBody = read_json(req).await?;
            compose(state, body).await.map(|r| Json(r).into_response())
        }
        Endpoint::ListRegistry => Ok(Json(state.registry.descriptors()).into_response()),
        Endpoint::RenderComponent(name) => {
            let bytes = read_body(req).await?;
            let props: Value = if bytes.iter().all(u8::is_ascii_whitespace) {
                json!({})
            } else {
                serde_json::from_slice(&bytes)?
            };
            let rendered = state.registry.invoke(&name, &props)?;
            Ok(Json(rendered).into_response())
        }
    }
}

async fn compose(state: &ApiState, body: ComposeBody) -> Result<ComposeResponse, AppError> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt is empty".into()));
    }

    let system = state.store.read_system_prompt().await?;
    let examples: Vec<FewShotExample> = serde_json::from_str(&state.store.read_examples().await?)
        .map_err(|e| AppError::Internal(format!("Few-shot examples are unusable: {e}")))?;

    let image_context = body.image.as_deref().map(prompt::describe_image_url);
    let messages = prompt::compose_messages(
        &system,
        &examples,
        &ComposeRequest {
            category: body.category,
            description: &body.prompt,
            url_context: body.reference.as_deref(),
            image_context: image_context.as_deref(),
            retry_error: body.retry_error.as_deref(),
        },
    );

    Ok(ComposeResponse {
        component_name: prompt::infer_component_name(&body.prompt),
        messages,
    })
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
struct SystemPromptBody {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentsQuery {
    #[serde(default)]
    category: Option<CategoryFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposeBody {
    prompt: String,
    #[serde(default)]
    category: Category,
    /// Text content of a reference page.
    #[serde(default)]
    reference: Option<String>,
    /// URL of a reference image, usually a capture.
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    retry_error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComposeResponse {
    component_name: String,
    messages: Vec<PromptMessage>,
}

fn ok() -> Response {
    Json(json!({ "ok": true })).into_response()
}

/// Buffer the whole body. The size cap comes from the `DefaultBodyLimit` layer.
async fn read_body(req: Request) -> Result<Bytes, AppError> {
    Bytes::from_request(req, &()).await.map_err(|rejection| {
        let message = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::TooLarge(message)
        } else {
            AppError::Validation(format!("Could not read request body: {message}"))
        }
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(req: Request<Body>) -> Result<T, AppError> {
    let bytes = read_body(req).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
