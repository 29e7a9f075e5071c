//! JSON schema builders for MCP tools.

use serde_json::{Map, Value};

/// Build the schema describing the `summarize` tool input.
pub(crate) fn summarize_input_schema(models: &[String], default_model: &str) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "text".into(),
        string_schema(
            "YouTube link, arXiv id or link, web URL, or a topic to look up on Wikipedia",
        ),
    );

    let mut model_schema = Map::new();
    model_schema.insert("type".into(), Value::String("string".into()));
    model_schema.insert(
        "description".into(),
        Value::String("Optional model override; defaults to the first configured model.".into()),
    );
    model_schema.insert(
        "enum".into(),
        Value::Array(models.iter().map(|model| Value::String(model.clone())).collect()),
    );
    model_schema.insert("default".into(), Value::String(default_model.into()));
    properties.insert("model".into(), Value::Object(model_schema));

    properties.insert(
        "file_path".into(),
        string_schema(
            "Optional path to a local .txt, .pdf, .mp3, .wav, .ogg, or .m4a file; takes precedence over text",
        ),
    );

    finalize_object_schema(properties, &[])
}

/// Build a schema for tools that take no arguments.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
