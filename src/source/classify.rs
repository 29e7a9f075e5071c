//! Routing rules that map an input onto a loader.
//!
//! Order matters and the first match wins:
//!
//! 1. uploads, by MIME type (`text/plain`, `application/pdf`, audio);
//! 2. text containing `www.youtube.com`;
//! 3. arXiv links or bare `DDDD.DDDDD` identifiers;
//! 4. anything else that looks like a URL (`http://`, `https://`, `www.`);
//! 5. any other non-blank text, treated as a Wikipedia query.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use super::{Classification, ClassifyError, FileKind, Source, SourceInput, Upload};

/// File extensions accepted for uploads.
pub const ACCEPTED_EXTENSIONS: [&str; 6] = ["txt", "pdf", "mp3", "wav", "ogg", "m4a"];

/// MIME types routed to the audio transcription loader.
pub const AUDIO_MIME_TYPES: [&str; 7] = [
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/x-m4a",
    "audio/x-wav",
    "audio/mp4",
    "audio/m4a",
];

const YOUTUBE_MARKER: &str = "www.youtube.com";
const ARXIV_PREFIXES: [&str; 2] = ["https://arxiv.org/", "http://arxiv.org/"];
const WEB_MARKERS: [&str; 3] = ["https://", "http://", "www."];
const GENERIC_MIME: &str = "application/octet-stream";

static ARXIV_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\.\d{5}$").expect("arXiv id pattern compiles"));
// New-style `1706.03762v7` or old-style `hep-th/9901001`, version optional.
static ARXIV_LINK_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}\.\d{4,5}|[a-z][a-z-]*(\.[A-Z]{2})?/\d{7})(v\d+)?$")
        .expect("arXiv link id pattern compiles")
});

/// Classify a request, checking the upload first and the free text second.
pub fn classify(input: SourceInput) -> Result<Classification, ClassifyError> {
    if let Some(upload) = input.upload {
        let kind = resolve_upload_kind(&upload)?;
        return Ok(Classification::Upload { kind, upload });
    }

    match input.text.as_deref() {
        Some(text) => classify_text(text).map(Classification::Remote),
        None => Err(ClassifyError::EmptyInput),
    }
}

/// Determine which file loader an upload needs.
///
/// The declared MIME type is authoritative unless it is missing or generic, in which case the
/// file extension decides.
pub fn resolve_upload_kind(upload: &Upload) -> Result<FileKind, ClassifyError> {
    let extension = Path::new(&upload.name)
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_lowercase);

    if let Some(extension) = extension.as_deref() {
        if !ACCEPTED_EXTENSIONS.contains(&extension) {
            return Err(ClassifyError::UnsupportedUpload {
                name: upload.name.clone(),
                mime: normalize_mime(upload.mime_type.as_deref()).unwrap_or_default(),
            });
        }
    }

    let mime = normalize_mime(upload.mime_type.as_deref())
        .filter(|mime| mime != GENERIC_MIME)
        .or_else(|| extension.as_deref().and_then(mime_from_extension).map(str::to_string))
        .unwrap_or_else(|| GENERIC_MIME.to_string());

    match mime.as_str() {
        "text/plain" => Ok(FileKind::Text),
        "application/pdf" => Ok(FileKind::Pdf),
        value if AUDIO_MIME_TYPES.contains(&value) => Ok(FileKind::Audio),
        _ => Err(ClassifyError::UnsupportedUpload {
            name: upload.name.clone(),
            mime,
        }),
    }
}

/// Route a line of free text to a remote source.
pub fn classify_text(text: &str) -> Result<Source, ClassifyError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ClassifyError::EmptyInput);
    }

    if text.contains(YOUTUBE_MARKER) {
        let video_id = youtube_video_id(text)
            .ok_or_else(|| ClassifyError::InvalidYouTubeLink(text.to_string()))?;
        return Ok(Source::YouTube { video_id });
    }

    if ARXIV_PREFIXES.iter().any(|prefix| text.contains(prefix)) {
        let paper_id = arxiv_id_from_link(text)
            .ok_or_else(|| ClassifyError::InvalidArxivLink(text.to_string()))?;
        return Ok(Source::Arxiv { paper_id });
    }
    if ARXIV_ID.is_match(text) {
        return Ok(Source::Arxiv {
            paper_id: text.to_string(),
        });
    }

    if let Some(url) = extract_url(text) {
        return Ok(Source::WebPage { url });
    }

    Ok(Source::Wikipedia {
        query: text.to_string(),
    })
}

/// The id is whatever follows the first `=`, up to the next query separator.
fn youtube_video_id(text: &str) -> Option<String> {
    let (_, rest) = text.split_once('=')?;
    let id: String = rest
        .chars()
        .take_while(|c| !matches!(c, '&' | '#' | '=') && !c.is_whitespace())
        .collect();
    (!id.is_empty()).then_some(id)
}

fn arxiv_id_from_link(text: &str) -> Option<String> {
    let start = ARXIV_PREFIXES
        .iter()
        .filter_map(|prefix| text.find(prefix).map(|index| index + prefix.len()))
        .min()?;
    let path: &str = text[start..]
        .split(|c: char| c.is_whitespace() || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    let id = path
        .strip_prefix("abs/")
        .or_else(|| path.strip_prefix("pdf/"))?
        .trim_end_matches('/');
    let id = id.strip_suffix(".pdf").unwrap_or(id);
    ARXIV_LINK_ID.is_match(id).then(|| id.to_string())
}

/// Pull the first URL-looking token out of the text and make it absolute.
fn extract_url(text: &str) -> Option<String> {
    text.split_whitespace().find_map(|token| {
        let start = WEB_MARKERS
            .iter()
            .filter_map(|marker| token.find(marker))
            .min()?;
        let candidate = &token[start..];
        if candidate.starts_with("www.") {
            Some(format!("https://{candidate}"))
        } else {
            Some(candidate.to_string())
        }
    })
}

fn normalize_mime(mime: Option<&str>) -> Option<String> {
    mime.map(|value| {
        value
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    })
    .filter(|value| !value.is_empty())
}

fn mime_from_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "m4a" => Some("audio/x-m4a"),
        _ => None,
    }
}
