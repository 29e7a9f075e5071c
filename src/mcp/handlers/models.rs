//! Handler for the models tool.

use std::sync::Arc;

use crate::processing::SummarizeApi;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `models` tool, listing selectable models and the default.
pub(crate) async fn handle_models(
    service: &Arc<dyn SummarizeApi>,
) -> Result<CallToolResult, McpError> {
    let catalog = service.models();
    Ok(CallToolResult::structured(json!({
        "default": catalog.default,
        "available": catalog.available,
    })))
}
