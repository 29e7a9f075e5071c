//! Summarization pipeline: upload storage, chunking, and the refine chain.

pub mod chunking;
pub mod refine;
mod service;
pub mod types;
pub mod uploads;

pub use service::{SummarizeApi, SummarizeService};
pub use types::{
    ChunkingError, ModelCatalog, PipelineSettings, ProcessingError, SummaryOutcome,
};
