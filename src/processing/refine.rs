//! Refine summarization: summarize the first chunk, then fold each following chunk into the
//! running summary one call at a time.

use crate::summarization::{SummarizationClient, SummarizationClientError, SummarizationRequest};

use super::chunking::Chunk;

/// Result of a refine run.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutput {
    /// Final running summary.
    pub summary: String,
    /// Running summary after every step, first chunk included.
    pub intermediate_steps: Vec<String>,
    /// Chunks that were folded in.
    pub chunks_summarized: usize,
    /// Chunks beyond `max_chunks` that were never sent.
    pub chunks_dropped: usize,
}

/// Prompt for the first chunk.
pub(crate) fn initial_prompt(text: &str) -> String {
    format!("Write a concise summary of the following:\n\n\n\"{text}\"\n\n\nCONCISE SUMMARY:")
}

/// Prompt folding `text` into the running summary.
pub(crate) fn refine_prompt(existing_answer: &str, text: &str) -> String {
    format!(
        "Your job is to produce a final summary.\n\
         We have provided an existing summary up to a certain point: {existing_answer}\n\
         We have the opportunity to refine the existing summary (only if needed) with some more context below.\n\
         ------------\n\
         {text}\n\
         ------------\n\
         Given the new context, refine the original summary.\n\
         If the context isn't useful, return the original summary."
    )
}

/// Summarize at most `max_chunks` leading chunks with the refine strategy.
///
/// Calls run sequentially; each prompt after the first embeds the previous answer.
pub async fn run_refine(
    client: &dyn SummarizationClient,
    model: &str,
    chunks: &[Chunk],
    max_chunks: usize,
) -> Result<RefineOutput, SummarizationClientError> {
    let selected = &chunks[..chunks.len().min(max_chunks)];
    let chunks_dropped = chunks.len() - selected.len();
    if chunks_dropped > 0 {
        tracing::info!(
            total = chunks.len(),
            kept = selected.len(),
            dropped = chunks_dropped,
            "Truncating chunks before summarization"
        );
    }

    let mut summary = String::new();
    let mut intermediate_steps = Vec::with_capacity(selected.len());
    for (step, chunk) in selected.iter().enumerate() {
        let prompt = if step == 0 {
            initial_prompt(&chunk.text)
        } else {
            refine_prompt(&summary, &chunk.text)
        };
        summary = client
            .generate_summary(SummarizationRequest {
                model: model.to_string(),
                prompt,
            })
            .await?;
        tracing::debug!(step, characters = summary.len(), "Refine step complete");
        intermediate_steps.push(summary.clone());
    }

    Ok(RefineOutput {
        summary,
        intermediate_steps,
        chunks_summarized: selected.len(),
        chunks_dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SummarizationClient for RecordingClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            let mut prompts = self.prompts.lock().expect("lock");
            prompts.push(request.prompt);
            Ok(format!("summary-{}", prompts.len()))
        }
    }

    struct FailingClient;

    #[async_trait]
    impl SummarizationClient for FailingClient {
        async fn generate_summary(
            &self,
            _request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            Err(SummarizationClientError::GenerationFailed("quota".into()))
        }
    }

    fn chunks(count: usize) -> Vec<Chunk> {
        (0..count)
            .map(|index| Chunk {
                text: format!("chunk {index}"),
                metadata: Default::default(),
            })
            .collect()
    }

    #[tokio::test]
    async fn folds_each_chunk_into_running_summary() {
        let client = RecordingClient::default();
        let output = run_refine(&client, "m", &chunks(3), 5)
            .await
            .expect("refined");

        let prompts = client.prompts.lock().expect("lock").clone();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0], initial_prompt("chunk 0"));
        assert!(prompts[0].ends_with("CONCISE SUMMARY:"));
        assert!(prompts[1].contains("up to a certain point: summary-1\n"));
        assert!(prompts[1].contains("------------\nchunk 1\n------------"));
        assert!(prompts[2].contains("up to a certain point: summary-2\n"));
        assert_eq!(output.summary, "summary-3");
        assert_eq!(
            output.intermediate_steps,
            vec!["summary-1", "summary-2", "summary-3"]
        );
        assert_eq!(output.chunks_summarized, 3);
        assert_eq!(output.chunks_dropped, 0);
    }

    #[tokio::test]
    async fn only_leading_chunks_are_summarized() {
        let client = RecordingClient::default();
        let output = run_refine(&client, "m", &chunks(8), 5)
            .await
            .expect("refined");

        assert_eq!(client.prompts.lock().expect("lock").len(), 5);
        assert_eq!(output.chunks_summarized, 5);
        assert_eq!(output.chunks_dropped, 3);
        assert_eq!(output.summary, "summary-5");
    }

    #[tokio::test]
    async fn provider_errors_stop_the_chain() {
        let error = run_refine(&FailingClient, "m", &chunks(2), 5)
            .await
            .expect_err("failure");
        assert!(matches!(error, SummarizationClientError::GenerationFailed(_)));
    }

    #[test]
    fn prompts_match_expected_templates() {
        assert_eq!(
            initial_prompt("Rust is fast."),
            "Write a concise summary of the following:\n\n\n\"Rust is fast.\"\n\n\nCONCISE SUMMARY:"
        );
        let refine = refine_prompt("Old {text} summary", "New context");
        assert!(refine.starts_with("Your job is to produce a final summary.\n"));
        assert!(refine.contains("existing summary up to a certain point: Old {text} summary\n"));
        assert!(refine.contains("------------\nNew context\n------------\n"));
        assert!(refine.ends_with("If the context isn't useful, return the original summary."));
    }
}
