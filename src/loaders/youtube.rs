//! Caption retrieval for YouTube videos via the Innertube player endpoint.

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use std::sync::LazyLock;

use super::{Document, LoaderError, ensure_success, squash_whitespace};

const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "20.10.38";
const PREFERRED_LANGUAGE: &str = "en";
const SOURCE_LABEL: &str = "youtube_transcript";

static API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([A-Za-z0-9_-]+)""#).expect("api key pattern compiles")
});

/// Fetches the caption track of a video and returns it as one document.
#[derive(Debug, Clone)]
pub struct YouTubeTranscriptLoader {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Tracklist,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
}

impl YouTubeTranscriptLoader {
    /// Create a loader rooted at `base_url` (normally `https://www.youtube.com`).
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Download and flatten the captions of `video_id`.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, video_id: &str) -> Result<Vec<Document>, LoaderError> {
        let base = self.base_url.trim_end_matches('/');

        let watch_page = ensure_success(
            self.http
                .get(format!("{base}/watch"))
                .query(&[("v", video_id)])
                .header("accept-language", "en-US")
                .send()
                .await?,
        )?
        .text()
        .await?;
        let api_key = API_KEY
            .captures(&watch_page)
            .and_then(|captures| captures.get(1))
            .map(|key| key.as_str().to_string())
            .ok_or_else(|| LoaderError::Parse {
                what: "YouTube watch page",
                message: "INNERTUBE_API_KEY not found".into(),
            })?;

        let player: PlayerResponse = ensure_success(
            self.http
                .post(format!("{base}/youtubei/v1/player"))
                .query(&[("key", api_key.as_str())])
                .json(&json!({
                    "context": {
                        "client": {
                            "clientName": CLIENT_NAME,
                            "clientVersion": CLIENT_VERSION,
                        }
                    },
                    "videoId": video_id,
                }))
                .send()
                .await?,
        )?
        .json()
        .await
        .map_err(|err| LoaderError::Parse {
            what: "YouTube player response",
            message: err.to_string(),
        })?;

        let tracks = player
            .captions
            .map(|captions| captions.player_captions_tracklist_renderer.caption_tracks)
            .unwrap_or_default();
        let track = select_track(&tracks)
            .ok_or_else(|| LoaderError::NoTranscript(video_id.to_string()))?;
        tracing::debug!(language = %track.language_code, "Selected caption track");

        let xml = ensure_success(
            self.http
                .get(track.base_url.replace("&fmt=srv3", ""))
                .send()
                .await?,
        )?
        .text()
        .await?;
        let snippets = parse_timed_text(&xml)?;
        if snippets.is_empty() {
            return Err(LoaderError::NoTranscript(video_id.to_string()));
        }

        Ok(vec![
            Document::new(snippets.join(" "))
                .with_metadata("source", SOURCE_LABEL)
                .with_metadata("video_id", video_id)
                .with_metadata("language", track.language_code.clone()),
        ])
    }
}

/// English wins, including regional variants; otherwise the first listed track.
fn select_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|track| track.language_code == PREFERRED_LANGUAGE)
        .or_else(|| {
            tracks
                .iter()
                .find(|track| track.language_code.starts_with("en-"))
        })
        .or_else(|| tracks.first())
}

/// Collect the text of every `<text>` element in a timed-text document.
fn parse_timed_text(xml: &str) -> Result<Vec<String>, LoaderError> {
    let mut reader = Reader::from_str(xml);
    let mut snippets = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                current = Some(String::new());
            }
            Ok(Event::Text(e)) => {
                if let Some(buffer) = current.as_mut() {
                    let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                    buffer.push_str(&decode_entities(&raw));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(buffer) = current.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some(snippet) = current.take() {
                    let snippet = squash_whitespace(&snippet);
                    if !snippet.is_empty() {
                        snippets.push(snippet);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(LoaderError::Parse {
                    what: "caption XML",
                    message: err.to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(snippets)
}

/// Captions are often escaped twice (`&amp;#39;`), so unescape until the text is stable.
fn decode_entities(raw: &str) -> String {
    let mut text = raw.to_string();
    for _ in 0..2 {
        let decoded = match quick_xml::escape::unescape(&text) {
            Ok(Cow::Owned(decoded)) => decoded,
            _ => break,
        };
        text = decoded;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    const TIMED_TEXT: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<transcript>
  <text start="0.0" dur="1.5">Never gonna</text>
  <text start="1.5" dur="2.0">give you up &amp;amp; never</text>
  <text start="3.5" dur="1.0">let you&#39;re down</text>
</transcript>"#;

    fn track(language: &str) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.org/{language}"),
            language_code: language.into(),
        }
    }

    #[test]
    fn prefers_english_track() {
        let tracks = vec![track("de"), track("en-GB"), track("en")];
        assert_eq!(select_track(&tracks).map(|t| t.language_code.as_str()), Some("en"));

        let tracks = vec![track("de"), track("en-GB")];
        assert_eq!(
            select_track(&tracks).map(|t| t.language_code.as_str()),
            Some("en-GB")
        );

        let tracks = vec![track("fr"), track("de")];
        assert_eq!(select_track(&tracks).map(|t| t.language_code.as_str()), Some("fr"));
        assert!(select_track(&[]).is_none());
    }

    #[test]
    fn timed_text_is_unescaped_and_flattened() {
        let snippets = parse_timed_text(TIMED_TEXT).expect("parsed");
        assert_eq!(
            snippets,
            vec!["Never gonna", "give you up & never", "let you're down"]
        );
    }

    #[tokio::test]
    async fn loads_transcript_through_player_endpoint() {
        let server = MockServer::start_async().await;
        let watch = server
            .mock_async(|when, then| {
                when.method(GET).path("/watch").query_param("v", "dQw4w9WgXcQ");
                then.status(200).body(
                    r#"<html><script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaTestKey_1"});</script></html>"#,
                );
            })
            .await;
        let base = server.base_url();
        let player = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/youtubei/v1/player")
                    .query_param("key", "AIzaTestKey_1");
                then.status(200).json_body(json!({
                    "captions": {
                        "playerCaptionsTracklistRenderer": {
                            "captionTracks": [
                                {
                                    "baseUrl": format!("{base}/api/timedtext?v=dQw4w9WgXcQ&lang=de&fmt=srv3"),
                                    "languageCode": "de"
                                },
                                {
                                    "baseUrl": format!("{base}/api/timedtext?v=dQw4w9WgXcQ&lang=en&fmt=srv3"),
                                    "languageCode": "en"
                                }
                            ]
                        }
                    }
                }));
            })
            .await;
        let captions = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/timedtext")
                    .query_param("lang", "en");
                then.status(200).body(TIMED_TEXT);
            })
            .await;

        let loader = YouTubeTranscriptLoader::new(Client::new(), server.base_url());
        let documents = loader.load("dQw4w9WgXcQ").await.expect("transcript");

        watch.assert_async().await;
        player.assert_async().await;
        captions.assert_async().await;
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0].page_content,
            "Never gonna give you up & never let you're down"
        );
        assert_eq!(documents[0].metadata["source"], json!("youtube_transcript"));
        assert_eq!(documents[0].metadata["video_id"], json!("dQw4w9WgXcQ"));
        assert_eq!(documents[0].metadata["language"], json!("en"));
    }

    #[tokio::test]
    async fn video_without_captions_reports_no_transcript() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/watch");
                then.status(200)
                    .body(r#"{"INNERTUBE_API_KEY":"key"}"#);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/youtubei/v1/player");
                then.status(200)
                    .json_body(json!({ "playabilityStatus": { "status": "OK" } }));
            })
            .await;

        let loader = YouTubeTranscriptLoader::new(Client::new(), server.base_url());
        let error = loader.load("silent").await.expect_err("no captions");
        assert!(matches!(error, LoaderError::NoTranscript(ref id) if id == "silent"));
    }

    #[tokio::test]
    async fn watch_page_without_key_is_a_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/watch");
                then.status(200).body("<html>consent wall</html>");
            })
            .await;

        let loader = YouTubeTranscriptLoader::new(Client::new(), server.base_url());
        let error = loader.load("abc").await.expect_err("no key");
        assert!(matches!(error, LoaderError::Parse { .. }));
    }
}
