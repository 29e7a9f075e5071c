//! HTTP surface for SmartGist.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /summarize` – Summarize free text: a YouTube link, arXiv id or link, web URL, or a
//!   Wikipedia query. Accepts `{ "text": "...", "model": "optional" }`.
//! - `POST /summarize/upload` – Multipart upload (`file`, optional `text` and `model`) for text
//!   files, PDFs, and audio recordings.
//! - `GET /models` – Selectable models and the default.
//! - `GET /metrics` – Request and chunk counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same pipeline with the MCP server and the CLI, so behavior is
//! identical across interfaces.

use crate::metrics::MetricsSnapshot;
use crate::processing::{ModelCatalog, ProcessingError, SummarizeApi, SummaryOutcome};
use crate::source::{ClassifyError, SourceInput, Upload};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Largest accepted multipart body.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SummarizeApi + ?Sized + 'static,
{
    Router::new()
        .route("/summarize", post(summarize_text::<S>))
        .route(
            "/summarize/upload",
            post(summarize_upload::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/models", get(get_models::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /summarize` endpoint.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Link, arXiv identifier, or search query.
    text: String,
    /// Optional model override (defaults to the first configured model).
    #[serde(default)]
    model: Option<String>,
}

/// Summarize whatever the text points at.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummaryOutcome>, AppError>
where
    S: SummarizeApi + ?Sized,
{
    let outcome = service
        .summarize(SourceInput::text(request.text), request.model)
        .await?;
    tracing::info!(
        source = %outcome.source,
        model = %outcome.model,
        chunks = outcome.chunks_total,
        dropped = outcome.chunks_dropped,
        "Summarize request completed"
    );
    Ok(Json(outcome))
}

/// Summarize an uploaded file.
///
/// Reads the `file`, `text`, and `model` parts; unknown parts are ignored. A file is required
/// here, and when present it takes precedence over the text.
async fn summarize_upload<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<SummaryOutcome>, AppError>
where
    S: SummarizeApi + ?Sized,
{
    let mut upload = None;
    let mut text = None;
    let mut model = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                upload = Some(Upload {
                    name: file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("text") => text = Some(field.text().await?),
            Some("model") => model = Some(field.text().await?),
            other => tracing::debug!(field = ?other, "Ignoring multipart field"),
        }
    }

    let Some(upload) = upload else {
        return Err(AppError::BadRequest(
            "multipart field 'file' is required".into(),
        ));
    };
    tracing::debug!(
        file = %upload.name,
        bytes = upload.bytes.len(),
        mime = ?upload.mime_type,
        "Received upload"
    );

    let outcome = service
        .summarize(
            SourceInput {
                upload: Some(upload),
                text,
            },
            model,
        )
        .await?;
    tracing::info!(
        source = %outcome.source,
        model = %outcome.model,
        chunks = outcome.chunks_total,
        dropped = outcome.chunks_dropped,
        "Upload summarize request completed"
    );
    Ok(Json(outcome))
}

/// List the models callers may select.
async fn get_models<S>(State(service): State<Arc<S>>) -> Json<ModelCatalog>
where
    S: SummarizeApi + ?Sized,
{
    Json(service.models())
}

/// Return a concise metrics snapshot with request and chunk counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SummarizeApi + ?Sized,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Summarize a YouTube video, arXiv paper, web page, or Wikipedia topic. Response returns { \"summary\": string, \"source\": string, ... }.",
                request_example: Some(json!({
                    "text": "https://arxiv.org/abs/1706.03762",
                    "model": "gemma-3n-e2b-it"
                })),
            },
            CommandDescriptor {
                name: "summarize_upload",
                method: "POST",
                path: "/summarize/upload",
                description: "Summarize an uploaded .txt, .pdf, or audio file sent as multipart form field 'file' (optional 'text' and 'model' fields).",
                request_example: None,
            },
            CommandDescriptor {
                name: "models",
                method: "GET",
                path: "/models",
                description: "Return the selectable models and the default.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return request and chunk counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Processing(ProcessingError),
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Processing(error) => match error {
                ProcessingError::Classify(ClassifyError::UnsupportedUpload { .. }) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                ProcessingError::Classify(_) | ProcessingError::UnknownModel { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ProcessingError::EmptyContent => StatusCode::UNPROCESSABLE_ENTITY,
                ProcessingError::Loader(_) | ProcessingError::Summarization(_) => {
                    StatusCode::BAD_GATEWAY
                }
                ProcessingError::Upload(_) | ProcessingError::Chunking(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Processing(error) => error.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::BadRequest(message) => message.clone(),
            Self::Processing(error) => error.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        }
        let body = json!({ "error": message, "kind": self.kind() });
        (status, Json(body)).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::BadRequest(format!("invalid multipart body: {}", inner.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::loaders::LoaderError;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        ModelCatalog, PipelineSettings, ProcessingError, SummarizeApi, SummaryOutcome,
    };
    use crate::source::{ClassifyError, SourceInput, SourceKind};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_summarize_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/summarize");
        assert!(commands.iter().any(|cmd| cmd.path == "/summarize/upload"));
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn summarize_route_forwards_text_and_model() {
        let service = Arc::new(StubSummarizeService::succeeding());
        let app = create_router(service.clone());

        let payload = json!({
            "text": "https://arxiv.org/abs/1706.03762",
            "model": "gemma-3n-e4b-it"
        });
        let response = app
            .oneshot(json_request("/summarize", payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["summary"], "A concise summary.");
        assert_eq!(json["source"], "arxiv");
        assert_eq!(json["chunks_dropped"], 0);

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0.text.as_deref(),
            Some("https://arxiv.org/abs/1706.03762")
        );
        assert!(calls[0].0.upload.is_none());
        assert_eq!(calls[0].1.as_deref(), Some("gemma-3n-e4b-it"));
    }

    #[tokio::test]
    async fn upload_route_reads_multipart_fields() {
        let service = Arc::new(StubSummarizeService::succeeding());
        let app = create_router(service.clone());

        let boundary = "smartgist-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             meeting notes\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"model\"\r\n\r\n\
             gemma-3n-e2b-it\r\n\
             --{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/summarize/upload")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let calls = service.recorded_calls().await;
        let upload = calls[0].0.upload.as_ref().expect("upload forwarded");
        assert_eq!(upload.name, "notes.txt");
        assert_eq!(upload.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(upload.bytes, b"meeting notes");
        assert_eq!(calls[0].1.as_deref(), Some("gemma-3n-e2b-it"));
    }

    #[tokio::test]
    async fn upload_route_requires_a_file() {
        let service = Arc::new(StubSummarizeService::succeeding());
        let app = create_router(service.clone());

        let boundary = "b";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"text\"\r\n\r\n\
             rust\r\n\
             --{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/summarize/upload")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "bad_request");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn pipeline_errors_map_to_status_codes() {
        let cases = [
            (
                ProcessingError::UnknownModel {
                    requested: "gpt-4".into(),
                    available: vec!["gemma-3n-e2b-it".into()],
                },
                StatusCode::BAD_REQUEST,
                "unknown_model",
            ),
            (
                ProcessingError::Classify(ClassifyError::UnsupportedUpload {
                    name: "a.exe".into(),
                    mime: "application/x-msdownload".into(),
                }),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_upload",
            ),
            (
                ProcessingError::EmptyContent,
                StatusCode::UNPROCESSABLE_ENTITY,
                "empty_content",
            ),
            (
                ProcessingError::Loader(LoaderError::NoResults("rust".into())),
                StatusCode::BAD_GATEWAY,
                "loader",
            ),
        ];

        for (error, status, kind) in cases {
            let service = Arc::new(StubSummarizeService::failing(error));
            let response = create_router(service)
                .oneshot(json_request("/summarize", json!({ "text": "rust" })))
                .await
                .expect("router response");

            assert_eq!(response.status(), status);
            let json = body_json(response).await;
            assert_eq!(json["kind"], kind);
            assert!(json["error"].as_str().is_some_and(|msg| !msg.is_empty()));
        }
    }

    #[tokio::test]
    async fn models_route_lists_catalog() {
        let service = Arc::new(StubSummarizeService::succeeding());
        let response = create_router(service)
            .oneshot(
                Request::builder()
                    .uri("/models")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["default"], "gemma-3n-e2b-it");
        assert_eq!(json["available"][1], "gemma-3n-e4b-it");
    }

    fn json_request(uri: &str, payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    type Call = (SourceInput, Option<String>);

    struct StubSummarizeService {
        calls: Mutex<Vec<Call>>,
        failure: Mutex<Option<ProcessingError>>,
    }

    impl StubSummarizeService {
        fn succeeding() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: Mutex::new(None),
            }
        }

        fn failing(error: ProcessingError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: Mutex::new(Some(error)),
            }
        }

        async fn recorded_calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummarizeApi for StubSummarizeService {
        async fn summarize(
            &self,
            input: SourceInput,
            model: Option<String>,
        ) -> Result<SummaryOutcome, ProcessingError> {
            self.calls.lock().await.push((input, model.clone()));
            if let Some(error) = self.failure.lock().await.take() {
                return Err(error);
            }
            Ok(SummaryOutcome {
                summary: "A concise summary.".into(),
                source: SourceKind::Arxiv,
                model: model.unwrap_or_else(|| "gemma-3n-e2b-it".into()),
                documents: 1,
                chunks_total: 2,
                chunks_summarized: 2,
                chunks_dropped: 0,
                intermediate_steps: vec!["draft".into(), "A concise summary.".into()],
            })
        }

        fn models(&self) -> ModelCatalog {
            ModelCatalog {
                default: "gemma-3n-e2b-it".into(),
                available: vec!["gemma-3n-e2b-it".into(), "gemma-3n-e4b-it".into()],
            }
        }

        fn settings(&self) -> PipelineSettings {
            PipelineSettings {
                chunk_size: 2000,
                chunk_overlap: 100,
                max_chunks: 5,
                models: self.models(),
                upload_dir: ".".into(),
                audio_enabled: false,
                tracing_enabled: false,
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                requests: 0,
                summaries_completed: 0,
                failures: 0,
                chunks_summarized: 0,
                chunks_dropped: 0,
            }
        }
    }
}
