//! Tool handlers for the MCP server.

use crate::processing::ProcessingError;
use rmcp::{ErrorData as McpError, model::JsonObject};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod metrics;
pub mod models;
pub mod summarize;

/// Parse structured arguments supplied to a tool invocation.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    let value = arguments
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(JsonObject::new()));
    parse_arguments_value(value)
}

/// Deserialize arguments represented as a JSON value into the target type.
pub(crate) fn parse_arguments_value<T: DeserializeOwned>(value: Value) -> Result<T, McpError> {
    serde_json::from_value(value)
        .map_err(|err| McpError::invalid_params(format!("Invalid arguments: {err}"), None))
}

/// Map a pipeline failure onto an MCP error: caller mistakes become invalid params.
pub(crate) fn processing_error(error: ProcessingError) -> McpError {
    let data = Some(serde_json::json!({ "kind": error.kind() }));
    match error {
        ProcessingError::Classify(_) | ProcessingError::UnknownModel { .. } => {
            McpError::invalid_params(error.to_string(), data)
        }
        _ => McpError::internal_error(error.to_string(), data),
    }
}
