//! Formatting helpers shared across MCP handlers and resources.

use crate::source::{ACCEPTED_EXTENSIONS, AUDIO_MIME_TYPES, SourceKind};
use rmcp::model::ResourceContents;
use schemars::JsonSchema;
use serde::Serialize;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Routing table returned by the `sources` resource.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct SourcesSnapshot {
    /// Rules in the order they are evaluated; the first match wins.
    pub(crate) routes: Vec<SourceRoute>,
    /// File extensions accepted for uploads.
    pub(crate) accepted_extensions: Vec<&'static str>,
    /// MIME types routed to audio transcription.
    pub(crate) audio_mime_types: Vec<&'static str>,
}

/// One routing rule.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct SourceRoute {
    /// Loader identifier, as reported in summary responses.
    pub(crate) source: &'static str,
    /// Human readable match condition.
    pub(crate) matches: &'static str,
}

/// Describe how inputs are routed to loaders.
pub(crate) fn sources_snapshot() -> SourcesSnapshot {
    let routes = [
        (SourceKind::TextFile, "uploaded file with MIME type text/plain"),
        (SourceKind::Pdf, "uploaded file with MIME type application/pdf"),
        (SourceKind::Audio, "uploaded file with an audio MIME type"),
        (SourceKind::YouTube, "text containing www.youtube.com"),
        (
            SourceKind::Arxiv,
            "arxiv.org link or an identifier shaped like 1706.03762",
        ),
        (
            SourceKind::WebPage,
            "text starting with http://, https://, or www.",
        ),
        (SourceKind::Wikipedia, "any other non-empty text"),
    ];

    SourcesSnapshot {
        routes: routes
            .into_iter()
            .map(|(kind, matches)| SourceRoute {
                source: kind.as_str(),
                matches,
            })
            .collect(),
        accepted_extensions: ACCEPTED_EXTENSIONS.to_vec(),
        audio_mime_types: AUDIO_MIME_TYPES.to_vec(),
    }
}
