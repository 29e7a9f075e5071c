//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    mcp::{
        format::{json_resource_contents, serialize_json, sources_snapshot},
        handlers::{
            metrics::handle_metrics, models::handle_models, summarize::handle_summarize,
        },
        registry, schemas,
    },
    processing::SummarizeApi,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const SOURCES_URI: &str = "mcp://smartgist/sources";
const SETTINGS_URI: &str = "mcp://smartgist/settings";

/// MCP server implementation exposing SmartGist operations.
#[derive(Clone)]
pub struct SmartGistMcpServer {
    service: Arc<dyn SummarizeApi>,
    registry: Arc<registry::Registry>,
}

impl SmartGistMcpServer {
    /// Create a new MCP server using the supplied summarization pipeline.
    pub fn new(service: Arc<dyn SummarizeApi>) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(SOURCES_URI, resource_sources);
        registry.register_resource(SETTINGS_URI, resource_settings);

        registry.register_tool("summarize", tool_summarize);
        registry.register_tool("models", tool_models);
        registry.register_tool("metrics", tool_metrics);

        Self {
            service,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        let catalog = self.service.models();
        let summarize_schema = Arc::new(schemas::summarize_input_schema(
            &catalog.available,
            &catalog.default,
        ));
        vec![
            Tool {
                name: Cow::Borrowed("summarize"),
                title: Some("Summarize Source".to_string()),
                description: Some(Cow::Borrowed(
                    "Summarize a YouTube video, arXiv paper, web page, Wikipedia topic, or a local text, PDF, or audio file.",
                )),
                input_schema: summarize_schema,
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Summarize Source")
                        .read_only(true)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("models"),
                title: Some("List Models".to_string()),
                description: Some(Cow::Borrowed(
                    "See which models `summarize` accepts and which one is used by default.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("List Models")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("metrics"),
                title: Some("Metrics Snapshot".to_string()),
                description: Some(Cow::Borrowed(
                    "Check request, failure, and chunk counters at a glance.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Metrics Snapshot")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut sources = RawResource::new(SOURCES_URI, "sources");
        sources.description =
            Some("How inputs are routed to loaders, and which uploads are accepted".into());

        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description = Some("Effective chunking, truncation, and model settings".into());

        vec![sources.no_annotation(), settings.no_annotation()]
    }
}

fn resource_sources(
    _server: &SmartGistMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SOURCES_URI,
                serialize_json(&sources_snapshot(), SOURCES_URI),
            )],
        })
    })
}

fn resource_settings(
    server: &SmartGistMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let settings = server.service.settings();
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                serialize_json(&settings, SETTINGS_URI),
            )],
        })
    })
}

fn tool_summarize(
    server: &SmartGistMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_summarize(&service, request.arguments).await })
}

fn tool_models(server: &SmartGistMcpServer, _request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_models(&service).await })
}

fn tool_metrics(
    server: &SmartGistMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_metrics(&service).await })
}

impl ServerHandler for SmartGistMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "smartgist".to_string();
        implementation.title = Some("SmartGist MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to summarize long sources without pasting them into the conversation. Pass a link, arXiv id, or topic as `text`, or a local file as `file_path`; read mcp://smartgist/sources to see how inputs are routed.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    #[allow(clippy::manual_async_fn)]
    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
