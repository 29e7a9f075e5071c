//! Audio transcription through the AssemblyAI REST API.
//!
//! The flow is upload → create transcript → poll until the job settles. Nothing is
//! transcribed locally.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

use super::{Document, LoaderError, ensure_success, read_file};

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const CREDENTIAL: &str = "ASSEMBLYAI_API_KEY";

/// Transcribes uploaded audio files into a single document.
#[derive(Debug, Clone)]
pub struct AudioTranscriptLoader {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_polls: u32,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    audio_duration: Option<f64>,
}

impl AudioTranscriptLoader {
    /// Create a loader against `base_url`. Without an API key every load fails fast.
    pub fn new(http: Client, base_url: String, api_key: Option<String>, max_polls: u32) -> Self {
        Self {
            http,
            base_url,
            api_key,
            max_polls,
            poll_interval: POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Transcribe the audio file stored at `path`.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn load(&self, path: &Path) -> Result<Vec<Document>, LoaderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LoaderError::MissingCredential(CREDENTIAL))?;
        let bytes = read_file(path).await?;
        tracing::debug!(bytes = bytes.len(), "Uploading audio for transcription");

        let upload: UploadResponse = ensure_success(
            self.http
                .post(self.endpoint("/v2/upload"))
                .header("authorization", api_key)
                .body(bytes)
                .send()
                .await?,
        )?
        .json()
        .await
        .map_err(|err| parse_error("upload response", err))?;

        let mut transcript: TranscriptResponse = ensure_success(
            self.http
                .post(self.endpoint("/v2/transcript"))
                .header("authorization", api_key)
                .json(&json!({ "audio_url": upload.upload_url }))
                .send()
                .await?,
        )?
        .json()
        .await
        .map_err(|err| parse_error("transcript response", err))?;
        tracing::info!(transcript_id = %transcript.id, "Transcript job created");

        let mut polls = 0;
        while !matches!(transcript.status.as_str(), "completed" | "error") {
            if polls >= self.max_polls {
                return Err(LoaderError::Timeout(format!(
                    "transcript {} after {polls} polls",
                    transcript.id
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;
            transcript = ensure_success(
                self.http
                    .get(self.endpoint(&format!("/v2/transcript/{}", transcript.id)))
                    .header("authorization", api_key)
                    .send()
                    .await?,
            )?
            .json()
            .await
            .map_err(|err| parse_error("transcript status", err))?;
            tracing::debug!(status = %transcript.status, polls, "Polled transcript");
        }

        if transcript.status == "error" {
            return Err(LoaderError::Transcription(
                transcript
                    .error
                    .unwrap_or_else(|| "unknown transcription error".into()),
            ));
        }

        let text = transcript.text.unwrap_or_default();
        let mut document = Document::new(text)
            .with_metadata("source", path.display().to_string())
            .with_metadata("transcript_id", transcript.id);
        if let Some(duration) = transcript.audio_duration {
            document = document.with_metadata("audio_duration", duration);
        }
        Ok(vec![document])
    }
}

fn parse_error(what: &'static str, err: reqwest::Error) -> LoaderError {
    LoaderError::Parse {
        what,
        message: err.to_string(),
    }
}
