//! Core data types and error definitions for the summarization pipeline.

use crate::{
    loaders::LoaderError, source::ClassifyError, source::SourceKind,
    summarization::SummarizationClientError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while splitting documents into chunks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkingError {
    /// Splitting was configured with an empty window.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would leave no room for new text in each window.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    OverlapTooLarge {
        /// Requested overlap.
        overlap: usize,
        /// Requested window.
        chunk_size: usize,
    },
}

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The input could not be routed to any loader.
    #[error("Invalid input: {0}")]
    Classify(#[from] ClassifyError),
    /// The uploaded file could not be written to the upload directory.
    #[error("Failed to store upload: {0}")]
    Upload(#[from] std::io::Error),
    /// The selected loader failed.
    #[error("Failed to load source: {0}")]
    Loader(#[from] LoaderError),
    /// Splitting the loaded documents failed.
    #[error("Failed to chunk documents: {0}")]
    Chunking(#[from] ChunkingError),
    /// The language model call failed.
    #[error("Failed to summarize: {0}")]
    Summarization(#[from] SummarizationClientError),
    /// The requested model is not in the configured list.
    #[error("Unknown model '{requested}'; choose one of: {}", available.join(", "))]
    UnknownModel {
        /// Model name supplied by the caller.
        requested: String,
        /// Models the server is configured to use.
        available: Vec<String>,
    },
    /// The source loaded fine but produced no text to summarize.
    #[error("The source contained no text to summarize")]
    EmptyContent,
}

impl ProcessingError {
    /// Stable machine-readable label for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Classify(ClassifyError::UnsupportedUpload { .. }) => "unsupported_upload",
            Self::Classify(_) => "invalid_input",
            Self::Upload(_) => "upload",
            Self::Loader(_) => "loader",
            Self::Chunking(_) => "chunking",
            Self::Summarization(_) => "summarization",
            Self::UnknownModel { .. } => "unknown_model",
            Self::EmptyContent => "empty_content",
        }
    }
}

/// Result of one summarization run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutcome {
    /// Final summary text.
    pub summary: String,
    /// Loader strategy chosen for the input.
    pub source: SourceKind,
    /// Model that produced the summary.
    pub model: String,
    /// Documents returned by the loader.
    pub documents: usize,
    /// Chunks produced by the splitter.
    pub chunks_total: usize,
    /// Chunks folded into the summary.
    pub chunks_summarized: usize,
    /// Chunks discarded because they fell past the chunk limit.
    pub chunks_dropped: usize,
    /// Running summary after each refine step, in order.
    pub intermediate_steps: Vec<String>,
}

/// Models a caller may choose from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCatalog {
    /// Model used when the request names none.
    pub default: String,
    /// Every selectable model, default first.
    pub available: Vec<String>,
}

/// Effective pipeline settings, for diagnostics surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSettings {
    /// Chunk window in characters.
    pub chunk_size: usize,
    /// Overlap between neighbouring chunks in characters.
    pub chunk_overlap: usize,
    /// Leading chunks summarized per request.
    pub max_chunks: usize,
    /// Selectable models.
    pub models: ModelCatalog,
    /// Directory uploads are written to.
    pub upload_dir: String,
    /// Whether audio transcription is configured.
    pub audio_enabled: bool,
    /// Whether runs are posted to the tracing service.
    pub tracing_enabled: bool,
}
