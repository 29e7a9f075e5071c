//! Model Context Protocol (MCP) integration for SmartGist.
//!
//! This module wires the summarization pipeline into an MCP server so editors and agent hosts
//! can summarize links, papers, topics, and local files over stdio. The surface area consists of:
//!
//! - Tools: `summarize`, `models`, and `metrics`.
//! - Resources: `mcp://smartgist/sources` (routing rules and accepted uploads) and
//!   `mcp://smartgist/settings` (chunking and model settings).
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::SmartGistMcpServer;
