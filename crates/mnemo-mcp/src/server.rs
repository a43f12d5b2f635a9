//! MCP Server implementation for mnemo.
//!
//! Exposes the Tool Dispatch Surface (§6): eleven named operations over the
//! memory engine.

use std::sync::Arc;

use mnemo_core::{Config, MemoryEngine};
use rmcp::handler::server::{router::tool::ToolRouter, wrapper::Parameters};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{not_found_error, to_mcp_error, validation_error};

/// Mnemo MCP Server
///
/// Gives an LLM client persistent, topic-routed conversational memory:
/// storing turns, retrieving relevant history, and maintaining a user
/// profile and extracted facts.
#[derive(Clone)]
pub struct MnemoMcpServer {
    pub(crate) engine: Arc<MemoryEngine>,
    pub(crate) tool_router: ToolRouter<Self>,
}

impl MnemoMcpServer {
    /// Builds the server from environment configuration (§6): opens the
    /// backing store at `$MEMORY_DATA_DIR` (or the XDG default) and wires the
    /// provider, if `OPENAI_API_KEY` is set.
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env();
        let engine = MemoryEngine::bootstrap(&config).await?;

        Ok(Self {
            engine: Arc::new(engine),
            tool_router: Self::tool_router(),
        })
    }

    /// Builds the server around an already-constructed engine, for tests.
    pub fn with_engine(engine: Arc<MemoryEngine>) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    /// Part of the documented shutdown sequence (§5): awaits in-flight
    /// Scribe tasks before the process exits.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for MnemoMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "mnemo-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Mnemo Memory Server".into()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Mnemo persistent conversational memory. Use store-conversation after every \
                 exchange, retrieve-memory to pull relevant history and facts before replying, \
                 and the profile/fact/topic tools to inspect or curate what's remembered."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn to_json(value: &impl Serialize) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Tool parameter shapes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreConversationParams {
    /// The user's message for this turn.
    pub message: String,

    /// The assistant's reply for this turn, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetrieveMemoryParams {
    /// Free-text query to search stored conversations and facts against.
    pub query: String,

    /// Maximum number of memories to return (default 5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetTopicHistoryParams {
    /// Thread identifier ("block_id").
    pub block_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateUserProfileParams {
    /// New display name, if changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Preferences to add (never removes existing ones).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Vec<String>>,

    /// Topics of interest to add (never removes existing ones).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics_of_interest: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddFactParams {
    /// Fact key, normalized to lowercase with underscores.
    pub key: String,

    /// Fact value.
    pub value: String,

    /// Confidence in [0.0, 1.0] (default 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetFactParams {
    /// Fact key to look up.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteFactParams {
    /// Fact key to delete.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArchiveTopicParams {
    /// Thread identifier ("block_id") to archive.
    pub block_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteTopicParams {
    /// Thread identifier ("block_id") to delete.
    pub block_id: String,
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router(router = tool_router)]
impl MnemoMcpServer {
    /// Ingests one conversational turn: routes it to a topic, persists it,
    /// and fans out to embedding and fact extraction.
    #[tool(description = "Store a conversational turn, routing it to a new or existing topic thread")]
    pub async fn store_conversation(
        &self,
        params: Parameters<StoreConversationParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if params.message.trim().is_empty() {
            return Err(validation_error("message must not be empty"));
        }

        let result = self
            .engine
            .store_conversation(params.message, params.context)
            .await
            .map_err(to_mcp_error)?;

        to_json(&result)
    }

    /// Hybrid keyword/vector retrieval over stored topics and facts.
    #[tool(description = "Retrieve relevant past conversations and facts for a query")]
    pub async fn retrieve_memory(
        &self,
        params: Parameters<RetrieveMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if params.query.trim().is_empty() {
            return Err(validation_error("query must not be empty"));
        }

        let result = self
            .engine
            .retrieve_memory(&params.query, params.max_results)
            .await
            .map_err(to_mcp_error)?;

        to_json(&result)
    }

    /// Lists every currently-ACTIVE topic thread (§3 invariant 1: at most one).
    #[tool(description = "List all currently active conversation topics")]
    pub async fn list_active_topics(&self) -> Result<CallToolResult, McpError> {
        let result = self.engine.list_active_topics().await.map_err(to_mcp_error)?;
        to_json(&result)
    }

    /// Fetches the full turn history of one topic thread.
    #[tool(description = "Get the full turn history and summary for a topic thread")]
    pub async fn get_topic_history(
        &self,
        params: Parameters<GetTopicHistoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = self
            .engine
            .get_topic_history(&params.block_id)
            .await
            .map_err(to_mcp_error)?
            .ok_or_else(|| not_found_error(&params.block_id))?;

        to_json(&result)
    }

    /// Reads the singleton user profile.
    #[tool(description = "Get the current user profile (name, preferences, topics of interest)")]
    pub async fn get_user_profile(&self) -> Result<CallToolResult, McpError> {
        let result = self.engine.get_user_profile().await.map_err(to_mcp_error)?;
        to_json(&result)
    }

    /// Merges new fields into the user profile (monotonic per §3 invariant 6).
    #[tool(description = "Update the user profile by adding preferences/topics or changing the name")]
    pub async fn update_user_profile(
        &self,
        params: Parameters<UpdateUserProfileParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let result = self
            .engine
            .update_user_profile(params.name, params.preferences, params.topics_of_interest)
            .await
            .map_err(to_mcp_error)?;

        to_json(&result)
    }

    /// Directly records a fact, bypassing the Fact Scrubber.
    #[tool(description = "Add a key/value fact with an optional confidence")]
    pub async fn add_fact(&self, params: Parameters<AddFactParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if params.key.trim().is_empty() {
            return Err(validation_error("key must not be empty"));
        }
        if params.value.trim().is_empty() {
            return Err(validation_error("value must not be empty"));
        }

        let id = self
            .engine
            .add_fact(params.key, params.value, params.confidence)
            .await
            .map_err(to_mcp_error)?;

        to_json(&id)
    }

    /// Looks up the most recent fact for a key.
    #[tool(description = "Get the most recent fact stored under a key")]
    pub async fn get_fact(&self, params: Parameters<GetFactParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let fact = self.engine.get_fact(&params.key).await.map_err(to_mcp_error)?;
        to_json(&fact)
    }

    /// Deletes every fact stored under a key.
    #[tool(description = "Delete all facts stored under a key")]
    pub async fn delete_fact(&self, params: Parameters<DeleteFactParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let count = self.engine.delete_fact(&params.key).await.map_err(to_mcp_error)?;
        to_json(&count)
    }

    /// Transitions a topic thread to ARCHIVED.
    #[tool(description = "Archive a topic thread")]
    pub async fn archive_topic(
        &self,
        params: Parameters<ArchiveTopicParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let archived = self
            .engine
            .archive_topic(&params.block_id)
            .await
            .map_err(to_mcp_error)?;

        if !archived {
            return Err(not_found_error(&params.block_id));
        }

        to_json(&serde_json::json!({ "block_id": params.block_id, "status": "ARCHIVED" }))
    }

    /// Deletes a topic thread, cascading to its turns and embeddings (§3 invariant 2).
    #[tool(description = "Delete a topic thread and its turns/embeddings")]
    pub async fn delete_topic(
        &self,
        params: Parameters<DeleteTopicParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let deleted = self.engine.delete_topic(&params.block_id).await.map_err(to_mcp_error)?;

        if !deleted {
            return Err(not_found_error(&params.block_id));
        }

        to_json(&serde_json::json!({ "block_id": params.block_id, "deleted": true }))
    }
}
