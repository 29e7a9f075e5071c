//! MCP handler for the `summarize` tool.

use std::path::Path;
use std::sync::Arc;

use crate::{
    processing::{SummarizeApi, SummaryOutcome},
    source::{SourceInput, Upload},
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{parse_arguments, processing_error};

/// Request payload accepted by the `summarize` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct SummarizeToolRequest {
    /// Link, arXiv identifier, or Wikipedia query.
    #[serde(default)]
    pub(crate) text: Option<String>,
    /// Optional model override.
    #[serde(default)]
    pub(crate) model: Option<String>,
    /// Optional path to a local `.txt`, `.pdf`, or audio file; wins over `text`.
    #[serde(default)]
    pub(crate) file_path: Option<String>,
}

/// Handle the `summarize` tool by running the full pipeline on the supplied input.
pub(crate) async fn handle_summarize(
    service: &Arc<dyn SummarizeApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: SummarizeToolRequest = parse_arguments(arguments)?;
    let SummarizeToolRequest {
        text,
        model,
        file_path,
    } = args;

    let text = text.filter(|value| !value.trim().is_empty());
    let file_path = file_path.filter(|value| !value.trim().is_empty());
    if text.is_none() && file_path.is_none() {
        return Err(McpError::invalid_params(
            "Provide `text` or `file_path`",
            None,
        ));
    }

    let upload = match file_path {
        Some(path) => Some(read_upload(Path::new(path.trim())).await?),
        None => None,
    };

    let outcome = service
        .summarize(SourceInput { upload, text }, model)
        .await
        .map_err(processing_error)?;

    Ok(CallToolResult::structured(outcome_payload(&outcome)))
}

async fn read_upload(path: &Path) -> Result<Upload, McpError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        McpError::invalid_params(format!("Cannot read {}: {err}", path.display()), None)
    })?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(Upload {
        name,
        mime_type: None,
        bytes,
    })
}

fn outcome_payload(outcome: &SummaryOutcome) -> Value {
    json!({
        "summary": outcome.summary,
        "source": outcome.source,
        "model": outcome.model,
        "documents": outcome.documents,
        "chunksTotal": outcome.chunks_total,
        "chunksSummarized": outcome.chunks_summarized,
        "chunksDropped": outcome.chunks_dropped,
        "intermediateSteps": outcome.intermediate_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics::MetricsSnapshot,
        processing::{ModelCatalog, PipelineSettings, ProcessingError},
        source::SourceKind,
    };
    use async_trait::async_trait;
    use rmcp::model::ErrorCode;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct StubService {
        inputs: Mutex<Vec<SourceInput>>,
    }

    #[async_trait]
    impl SummarizeApi for StubService {
        async fn summarize(
            &self,
            input: SourceInput,
            model: Option<String>,
        ) -> Result<SummaryOutcome, ProcessingError> {
            if model.as_deref() == Some("unknown") {
                return Err(ProcessingError::UnknownModel {
                    requested: "unknown".into(),
                    available: vec!["gemma-3n-e2b-it".into()],
                });
            }
            self.inputs.lock().await.push(input);
            Ok(SummaryOutcome {
                summary: "short".into(),
                source: SourceKind::TextFile,
                model: "gemma-3n-e2b-it".into(),
                documents: 1,
                chunks_total: 1,
                chunks_summarized: 1,
                chunks_dropped: 0,
                intermediate_steps: vec!["short".into()],
            })
        }

        fn models(&self) -> ModelCatalog {
            ModelCatalog {
                default: "gemma-3n-e2b-it".into(),
                available: vec!["gemma-3n-e2b-it".into()],
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

    fn arguments(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[tokio::test]
    async fn local_file_is_forwarded_as_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "meeting notes").expect("write");

        let stub = Arc::new(StubService::default());
        let service: Arc<dyn SummarizeApi> = stub.clone();
        let result = handle_summarize(
            &service,
            arguments(json!({ "file_path": path.display().to_string() })),
        )
        .await
        .expect("summarized");

        let payload = result.structured_content.expect("structured payload");
        assert_eq!(payload["summary"], "short");
        assert_eq!(payload["source"], "text_file");
        assert_eq!(payload["chunksDropped"], 0);

        let inputs = stub.inputs.lock().await;
        let upload = inputs[0].upload.as_ref().expect("upload");
        assert_eq!(upload.name, "notes.txt");
        assert_eq!(upload.bytes, b"meeting notes");
    }

    #[tokio::test]
    async fn missing_input_is_invalid_params() {
        let service: Arc<dyn SummarizeApi> = Arc::new(StubService::default());
        let error = handle_summarize(&service, arguments(json!({ "text": "   " })))
            .await
            .expect_err("rejected");
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unreadable_file_is_invalid_params() {
        let service: Arc<dyn SummarizeApi> = Arc::new(StubService::default());
        let error = handle_summarize(
            &service,
            arguments(json!({ "file_path": "/definitely/not/here.txt" })),
        )
        .await
        .expect_err("rejected");
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_model_is_invalid_params() {
        let service: Arc<dyn SummarizeApi> = Arc::new(StubService::default());
        let error = handle_summarize(
            &service,
            arguments(json!({ "text": "rust", "model": "unknown" })),
        )
        .await
        .expect_err("rejected");
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(error.data, Some(json!({ "kind": "unknown_model" })));
    }
}
