//! Content loaders that turn a classified [`Source`] into [`Document`]s.
//!
//! Each strategy lives in its own submodule. [`Loaders`] owns one instance of each and
//! dispatches on the source variant; the processing service only sees the [`SourceLoader`]
//! trait so tests can substitute canned documents.

mod arxiv;
mod audio;
mod pdf;
mod text;
mod web;
mod wikipedia;
mod youtube;

use crate::{
    config::Config,
    source::{FileKind, Source},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub use arxiv::ArxivLoader;
pub use audio::AudioTranscriptLoader;
pub use pdf::PdfLoader;
pub use text::TextFileLoader;
pub use web::WebPageLoader;
pub use wikipedia::WikipediaLoader;
pub use youtube::YouTubeTranscriptLoader;

const USER_AGENT: &str = concat!("smartgist/", env!("CARGO_PKG_VERSION"));

/// Metadata attached to a loaded document.
pub type Metadata = BTreeMap<String, Value>;

/// One unit of extracted content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Extracted text.
    pub page_content: String,
    /// Loader-specific metadata (source, title, page number, ...).
    pub metadata: Metadata,
}

impl Document {
    /// Create a document without metadata.
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry, replacing any previous value for the key.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Errors raised while loading a source.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Reading a stored upload failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Remote endpoint answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Status code returned.
        status: u16,
        /// URL that was requested.
        url: String,
    },
    /// Transport-level failure talking to a remote endpoint.
    #[error("network error: {0}")]
    Network(String),
    /// Remote payload did not have the expected shape.
    #[error("failed to parse {what}: {message}")]
    Parse {
        /// Payload being parsed.
        what: &'static str,
        /// Parser diagnostic.
        message: String,
    },
    /// PDF could not be decoded.
    #[error("PDF error: {0}")]
    Pdf(String),
    /// A required API key is not configured.
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),
    /// Transcription service reported a failure.
    #[error("transcription failed: {0}")]
    Transcription(String),
    /// Video exists but has no caption track.
    #[error("no transcript available for video {0}")]
    NoTranscript(String),
    /// Search returned nothing.
    #[error("no results for '{0}'")]
    NoResults(String),
    /// Source decoded fine but contained no text.
    #[error("no text could be extracted from {0}")]
    NoText(String),
    /// Operation exceeded its time budget.
    #[error("{0} timed out")]
    Timeout(String),
}

impl From<reqwest::Error> for LoaderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let target = err
                .url()
                .map(|url| url.to_string())
                .unwrap_or_else(|| "request".into());
            LoaderError::Timeout(target)
        } else if let Some(status) = err.status() {
            LoaderError::Http {
                status: status.as_u16(),
                url: err.url().map(|url| url.to_string()).unwrap_or_default(),
            }
        } else {
            LoaderError::Network(err.to_string())
        }
    }
}

/// Anything that can turn a [`Source`] into documents.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load all documents for the given source.
    async fn load(&self, source: &Source) -> Result<Vec<Document>, LoaderError>;
}

/// Dispatches each source to its dedicated loader.
pub struct Loaders {
    text: TextFileLoader,
    pdf: PdfLoader,
    audio: AudioTranscriptLoader,
    youtube: YouTubeTranscriptLoader,
    web: WebPageLoader,
    arxiv: ArxivLoader,
    wikipedia: WikipediaLoader,
}

impl Loaders {
    /// Build every loader from configuration, sharing one HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, LoaderError> {
        let http = http_client(config)?;
        Ok(Self {
            text: TextFileLoader::new(),
            pdf: PdfLoader::new(),
            audio: AudioTranscriptLoader::new(
                http.clone(),
                config.assemblyai_base_url.clone(),
                config.assemblyai_api_key.clone(),
                config.assemblyai_max_polls,
            ),
            youtube: YouTubeTranscriptLoader::new(
                http.clone(),
                config.sources.youtube_base_url.clone(),
            ),
            web: WebPageLoader::new(http.clone()),
            arxiv: ArxivLoader::new(http.clone(), config.sources.arxiv_api_url.clone()),
            wikipedia: WikipediaLoader::new(http, config.sources.wikipedia_api_url.clone()),
        })
    }
}

#[async_trait]
impl SourceLoader for Loaders {
    async fn load(&self, source: &Source) -> Result<Vec<Document>, LoaderError> {
        let kind = source.kind();
        tracing::debug!(source = %kind, "Invoking loader");
        let documents = match source {
            Source::File { kind, path } => match kind {
                FileKind::Text => self.text.load(path).await?,
                FileKind::Pdf => self.pdf.load(path).await?,
                FileKind::Audio => self.audio.load(path).await?,
            },
            Source::YouTube { video_id } => self.youtube.load(video_id).await?,
            Source::Arxiv { paper_id } => self.arxiv.load(paper_id).await?,
            Source::WebPage { url } => self.web.load(url).await?,
            Source::Wikipedia { query } => self.wikipedia.load(query).await?,
        };
        tracing::info!(
            source = %kind,
            documents = documents.len(),
            characters = documents.iter().map(|doc| doc.page_content.len()).sum::<usize>(),
            "Loader finished"
        );
        Ok(documents)
    }
}

/// Build the outbound HTTP client shared by the remote loaders.
pub(crate) fn http_client(config: &Config) -> Result<reqwest::Client, LoaderError> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = config.http_timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| LoaderError::Network(format!("failed to build HTTP client: {err}")))
}

/// Read a stored file, wrapping IO errors with the path.
pub(crate) async fn read_file(path: &Path) -> Result<Vec<u8>, LoaderError> {
    tokio::fs::read(path).await.map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Return an error for non-success responses, otherwise hand the response back.
pub(crate) fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LoaderError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(LoaderError::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// Collapse whitespace runs into single spaces.
pub(crate) fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
