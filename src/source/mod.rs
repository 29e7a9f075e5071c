//! Input model and source classification.
//!
//! A request carries an optional uploaded file and an optional line of free text. The
//! classifier inspects them in a fixed order and picks exactly one [`Source`] for the loader
//! layer; uploads always win over text.

mod classify;

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub use classify::{
    ACCEPTED_EXTENSIONS, AUDIO_MIME_TYPES, classify, classify_text, resolve_upload_kind,
};

/// File uploaded alongside a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Original file name as supplied by the client.
    pub name: String,
    /// Declared MIME type, if the client sent one.
    pub mime_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Everything a user supplied for one summarization request.
#[derive(Debug, Clone, Default)]
pub struct SourceInput {
    /// Uploaded file, checked before any text.
    pub upload: Option<Upload>,
    /// Free-text query, URL, or identifier.
    pub text: Option<String>,
}

impl SourceInput {
    /// Input consisting of free text only.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            upload: None,
            text: Some(text.into()),
        }
    }

    /// Input consisting of an uploaded file only.
    pub fn upload(upload: Upload) -> Self {
        Self {
            upload: Some(upload),
            text: None,
        }
    }
}

/// Kinds of uploaded files the pipeline can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Plain UTF-8 text.
    Text,
    /// PDF document.
    Pdf,
    /// Audio recording that needs transcription.
    Audio,
}

/// A fully resolved source ready for a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Uploaded file persisted at `path`.
    File {
        /// What the file contains.
        kind: FileKind,
        /// Location of the stored upload.
        path: PathBuf,
    },
    /// YouTube video whose captions should be fetched.
    YouTube {
        /// Video identifier taken from the link.
        video_id: String,
    },
    /// arXiv paper identifier.
    Arxiv {
        /// Identifier such as `1706.03762`.
        paper_id: String,
    },
    /// Generic web page.
    WebPage {
        /// Absolute URL to fetch.
        url: String,
    },
    /// Wikipedia search query.
    Wikipedia {
        /// Search terms.
        query: String,
    },
}

impl Source {
    /// Label describing which loader handles this source.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::File { kind, .. } => (*kind).into(),
            Self::YouTube { .. } => SourceKind::YouTube,
            Self::Arxiv { .. } => SourceKind::Arxiv,
            Self::WebPage { .. } => SourceKind::WebPage,
            Self::Wikipedia { .. } => SourceKind::Wikipedia,
        }
    }
}

/// Loader strategy chosen by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Plain-text file loader.
    TextFile,
    /// PDF loader.
    Pdf,
    /// Audio transcription loader.
    Audio,
    /// YouTube transcript fetcher.
    #[serde(rename = "youtube")]
    YouTube,
    /// arXiv paper loader.
    Arxiv,
    /// Generic web-page loader.
    WebPage,
    /// Wikipedia query loader.
    Wikipedia,
}

impl SourceKind {
    /// Stable identifier used in logs and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextFile => "text_file",
            Self::Pdf => "pdf",
            Self::Audio => "audio",
            Self::YouTube => "youtube",
            Self::Arxiv => "arxiv",
            Self::WebPage => "web_page",
            Self::Wikipedia => "wikipedia",
        }
    }
}

impl From<FileKind> for SourceKind {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Text => Self::TextFile,
            FileKind::Pdf => Self::Pdf,
            FileKind::Audio => Self::Audio,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a [`SourceInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The uploaded file must be stored before it can be loaded.
    Upload {
        /// Loader the file is routed to.
        kind: FileKind,
        /// The file itself.
        upload: Upload,
    },
    /// The text resolved directly to a remote source.
    Remote(Source),
}

impl Classification {
    /// Loader strategy this classification leads to.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Upload { kind, .. } => (*kind).into(),
            Self::Remote(source) => source.kind(),
        }
    }
}

/// Reasons an input could not be routed to a loader.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// Neither a file nor any non-blank text was supplied.
    #[error("no file was uploaded and no text was provided")]
    EmptyInput,
    /// The uploaded file is outside the accepted types.
    #[error("unsupported upload '{name}' with type '{mime}'")]
    UnsupportedUpload {
        /// File name supplied by the client.
        name: String,
        /// Resolved MIME type.
        mime: String,
    },
    /// A YouTube link did not carry a video identifier.
    #[error("YouTube link has no video id: {0}")]
    InvalidYouTubeLink(String),
    /// An arXiv link did not carry a paper identifier.
    #[error("arXiv link has no paper id: {0}")]
    InvalidArxivLink(String),
}
