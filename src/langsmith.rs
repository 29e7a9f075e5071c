//! Optional run tracing to a LangSmith-compatible endpoint.
//!
//! Each pipeline run is posted once, after it finishes, as a `chain` run. Tracing never affects
//! the request: failures to reach the endpoint are logged and dropped.

use crate::config::LangSmithSettings;
use reqwest::Client;
use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

const RUN_NAME: &str = "SmartGist";

/// Posts finished pipeline runs to the tracing service.
#[derive(Debug, Clone)]
pub struct RunTracer {
    http: Client,
    endpoint: String,
    api_key: String,
    project: String,
}

/// A run that has started but not yet been reported.
#[derive(Debug, Clone)]
pub struct TracedRun {
    id: Uuid,
    started_at: OffsetDateTime,
    inputs: Value,
}

impl TracedRun {
    /// Identifier the run will be reported under.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Set one input field, replacing any earlier value under `key`.
    pub fn record_input(&mut self, key: &str, value: impl Into<Value>) {
        if !self.inputs.is_object() {
            self.inputs = json!({});
        }
        if let Some(inputs) = self.inputs.as_object_mut() {
            inputs.insert(key.to_string(), value.into());
        }
    }
}

impl RunTracer {
    /// Build a tracer when tracing is enabled and a key is configured.
    pub fn from_settings(http: Client, settings: &LangSmithSettings) -> Option<Self> {
        if !settings.is_active() {
            return None;
        }
        let api_key = settings.api_key.clone()?;
        Some(Self {
            http,
            endpoint: settings.endpoint.clone(),
            api_key,
            project: settings.project.clone(),
        })
    }

    /// Mark the start of a run with the given inputs.
    pub fn start(&self, inputs: Value) -> TracedRun {
        TracedRun {
            id: Uuid::new_v4(),
            started_at: OffsetDateTime::now_utc(),
            inputs,
        }
    }

    /// Report a finished run. `outcome` carries the outputs on success or the error message.
    pub async fn finish(&self, run: TracedRun, outcome: Result<Value, String>) {
        let payload = self.run_payload(run, outcome, OffsetDateTime::now_utc());
        let url = format!("{}/runs", self.endpoint.trim_end_matches('/'));
        match self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(run_id = %payload["id"], "Posted trace run");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Trace endpoint rejected run");
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to post trace run");
            }
        }
    }

    fn run_payload(
        &self,
        run: TracedRun,
        outcome: Result<Value, String>,
        ended_at: OffsetDateTime,
    ) -> Value {
        let (outputs, error) = match outcome {
            Ok(outputs) => (outputs, Value::Null),
            Err(message) => (Value::Null, Value::String(message)),
        };
        json!({
            "id": run.id.to_string(),
            "name": RUN_NAME,
            "run_type": "chain",
            "inputs": run.inputs,
            "outputs": outputs,
            "error": error,
            "start_time": format_time(run.started_at),
            "end_time": format_time(ended_at),
            "session_name": self.project,
        })
    }
}

fn format_time(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}
