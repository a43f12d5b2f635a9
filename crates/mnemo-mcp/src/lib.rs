//! Mnemo MCP Server
//!
//! Exposes the mnemo hierarchical conversational memory engine to an LLM
//! client over the Model Context Protocol.

pub mod error;
pub mod server;

pub use server::MnemoMcpServer;
