//! Handler for the metrics tool.

use std::sync::Arc;

use crate::processing::SummarizeApi;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the current request counters.
pub(crate) async fn handle_metrics(
    service: &Arc<dyn SummarizeApi>,
) -> Result<CallToolResult, McpError> {
    let snapshot = service.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "requests": snapshot.requests,
        "summariesCompleted": snapshot.summaries_completed,
        "failures": snapshot.failures,
        "chunksSummarized": snapshot.chunks_summarized,
        "chunksDropped": snapshot.chunks_dropped,
    })))
}
