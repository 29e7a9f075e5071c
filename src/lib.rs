#![deny(missing_docs)]

//! Core library for SmartGist, a multi-source document summarizer.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Optional run tracing to a LangSmith-compatible endpoint.
pub mod langsmith;
/// Source loaders for files, videos, papers, web pages, and Wikipedia.
pub mod loaders;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Summarization metrics helpers.
pub mod metrics;
/// Summarization pipeline: uploads, chunking, and the refine chain.
pub mod processing;
/// Input model and source classification.
pub mod source;
/// Language-model client abstraction and the Google Generative Language adapter.
pub mod summarization;
