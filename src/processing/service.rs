//! Summarization service coordinating classification, loading, chunking, and the refine chain.

use crate::{
    config::Config,
    langsmith::{RunTracer, TracedRun},
    loaders::{Loaders, SourceLoader, http_client},
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        chunking::RecursiveCharacterSplitter,
        refine::run_refine,
        types::{ModelCatalog, PipelineSettings, ProcessingError, SummaryOutcome},
        uploads::UploadStore,
    },
    source::{Classification, Source, SourceInput, classify},
    summarization::{SummarizationClient, summarization_client},
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Runs one summarization request end to end.
///
/// The service owns long-lived handles to the loaders, the language-model client, the upload
/// directory, and the metrics registry so that the HTTP surface, the MCP tools, and the CLI all
/// share the same components. Construct it once near process start and share it through an
/// `Arc`.
pub struct SummarizeService {
    config: Config,
    loader: Arc<dyn SourceLoader>,
    client: Arc<dyn SummarizationClient>,
    uploads: UploadStore,
    splitter: RecursiveCharacterSplitter,
    metrics: Arc<SummaryMetrics>,
    tracer: Option<RunTracer>,
}

/// Abstraction over the summarization pipeline used by external surfaces (HTTP, MCP, CLI).
#[async_trait]
pub trait SummarizeApi: Send + Sync {
    /// Summarize whatever the input points at, optionally with a specific model.
    async fn summarize(
        &self,
        input: SourceInput,
        model: Option<String>,
    ) -> Result<SummaryOutcome, ProcessingError>;

    /// Models callers may select.
    fn models(&self) -> ModelCatalog;

    /// Effective pipeline settings.
    fn settings(&self) -> PipelineSettings;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummarizeService {
    /// Build the service with the production loaders and language-model client.
    pub fn new(config: Config) -> Result<Self, ProcessingError> {
        tracing::info!("Initializing loaders");
        let loader: Arc<dyn SourceLoader> = Arc::new(Loaders::from_config(&config)?);
        let client = summarization_client(&config)?;
        tracing::info!(models = ?config.models, "Summarization client initialized");
        Self::with_components(config, loader, client)
    }

    /// Build the service around caller-supplied loader and client implementations.
    pub fn with_components(
        config: Config,
        loader: Arc<dyn SourceLoader>,
        client: Arc<dyn SummarizationClient>,
    ) -> Result<Self, ProcessingError> {
        let splitter = RecursiveCharacterSplitter::new(config.chunk_size, config.chunk_overlap)?;
        let tracer = if config.langsmith.is_active() {
            RunTracer::from_settings(http_client(&config)?, &config.langsmith)
        } else {
            None
        };
        if tracer.is_some() {
            tracing::info!(project = %config.langsmith.project, "Run tracing enabled");
        }

        Ok(Self {
            uploads: UploadStore::new(config.upload_dir.clone()),
            config,
            loader,
            client,
            splitter,
            metrics: Arc::new(SummaryMetrics::new()),
            tracer,
        })
    }

    /// Summarize the input and record the run in metrics and, when enabled, the tracer.
    pub async fn summarize(
        &self,
        input: SourceInput,
        model: Option<String>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        self.metrics.record_request();
        let mut run = self
            .tracer
            .as_ref()
            .map(|tracer| tracer.start(json!({ "model": model })));

        let result = self.run_pipeline(input, model.as_deref(), run.as_mut()).await;

        match &result {
            Ok(outcome) => {
                self.metrics.record_summary(
                    outcome.chunks_summarized as u64,
                    outcome.chunks_dropped as u64,
                );
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::warn!(kind = error.kind(), %error, "Summarization failed");
            }
        }

        if let (Some(tracer), Some(run)) = (self.tracer.as_ref(), run) {
            let outcome = match &result {
                Ok(outcome) => Ok(json!({
                    "output_text": outcome.summary,
                    "source": outcome.source,
                    "intermediate_steps": outcome.intermediate_steps,
                })),
                Err(error) => Err(error.to_string()),
            };
            tracer.finish(run, outcome).await;
        }

        result
    }

    async fn run_pipeline(
        &self,
        input: SourceInput,
        requested_model: Option<&str>,
        run: Option<&mut TracedRun>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let model = self
            .config
            .resolve_model(requested_model)
            .ok_or_else(|| ProcessingError::UnknownModel {
                requested: requested_model.unwrap_or_default().trim().to_string(),
                available: self.config.models.clone(),
            })?
            .to_string();

        let classification = classify(input)?;
        let kind = classification.kind();
        if let Some(run) = run {
            run.record_input("model", model.as_str());
            run.record_input("source", kind.as_str());
        }
        tracing::info!(source = %kind, model = %model, "Classified input");

        let source = match classification {
            Classification::Remote(source) => source,
            Classification::Upload {
                kind: file_kind,
                upload,
            } => {
                let path = self.uploads.store(&upload).await?;
                Source::File {
                    kind: file_kind,
                    path,
                }
            }
        };

        let documents = self.loader.load(&source).await?;
        let chunks = self.splitter.split_documents(&documents);
        if chunks.is_empty() {
            return Err(ProcessingError::EmptyContent);
        }
        tracing::debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            chunk_size = self.config.chunk_size,
            overlap = self.config.chunk_overlap,
            "Split documents"
        );

        let refined = run_refine(
            self.client.as_ref(),
            &model,
            &chunks,
            self.config.max_chunks,
        )
        .await?;

        tracing::info!(
            source = %kind,
            model = %model,
            chunks = chunks.len(),
            summarized = refined.chunks_summarized,
            dropped = refined.chunks_dropped,
            "Summary generated"
        );

        Ok(SummaryOutcome {
            summary: refined.summary,
            source: kind,
            model,
            documents: documents.len(),
            chunks_total: chunks.len(),
            chunks_summarized: refined.chunks_summarized,
            chunks_dropped: refined.chunks_dropped,
            intermediate_steps: refined.intermediate_steps,
        })
    }

    /// Models callers may select, default first.
    pub fn models(&self) -> ModelCatalog {
        ModelCatalog {
            default: self.config.default_model().to_string(),
            available: self.config.models.clone(),
        }
    }

    /// Effective pipeline settings.
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            max_chunks: self.config.max_chunks,
            models: self.models(),
            upload_dir: self.uploads.dir().display().to_string(),
            audio_enabled: self.config.assemblyai_api_key.is_some(),
            tracing_enabled: self.tracer.is_some(),
        }
    }

    /// Return the current summarization metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl SummarizeApi for SummarizeService {
    async fn summarize(
        &self,
        input: SourceInput,
        model: Option<String>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        SummarizeService::summarize(self, input, model).await
    }

    fn models(&self) -> ModelCatalog {
        SummarizeService::models(self)
    }

    fn settings(&self) -> PipelineSettings {
        SummarizeService::settings(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummarizeService::metrics_snapshot(self)
    }
}
