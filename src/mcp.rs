//! MCP JSON-RPC protocol bridge.
//!
//! Serves the archive's tools over MCP Streamable HTTP so that MCP clients
//! can call them with the standard `tools/list` / `tools/call` methods.
//!
//! * `index_codebase` returns the run result as pretty-printed JSON.
//! * `search_legacy_code` returns the ranked hits rendered as markdown.
//!
//! Failures inside a tool come back as tool results with `isError` set.
//! Unknown tool names and malformed arguments are protocol errors.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::{ErrorData as McpError, ServerHandler};
use tracing::debug;

use crate::server::{search, tool_catalog, AppState, SearchParams, ToolInfo, INDEX_TOOL, SEARCH_TOOL};

/// Bridges the archive tools to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone of this struct; the coordinator and
/// query engine behind it are shared, so runs stay serialized across
/// sessions.
#[derive(Clone)]
pub struct McpBridge {
    state: AppState,
}

/// Builds the tower service mounted at `/mcp`.
pub fn service(state: AppState) -> StreamableHttpService<McpBridge, LocalSessionManager> {
    let bridge = McpBridge::new(state);
    StreamableHttpService::new(
        move || Ok(bridge.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    )
}

impl McpBridge {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn to_mcp_tool(info: &ToolInfo) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match &info.parameters {
                serde_json::Value::Object(map) => Arc::new(map.clone()),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Owned(info.name.clone()),
            title: None,
            description: Some(Cow::Owned(info.description.clone())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(info.read_only)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    /// Tool descriptors advertised to MCP clients.
    pub fn tools(&self) -> Vec<Tool> {
        tool_catalog().iter().map(Self::to_mcp_tool).collect()
    }

    /// Runs one tool call.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %name, "mcp tool call");
        match name {
            INDEX_TOOL => {
                let result = self.state.coordinator.run().await;
                let text = serde_json::to_string_pretty(&result).map_err(|e| {
                    McpError::new(
                        ErrorCode::INTERNAL_ERROR,
                        format!("{}: {}", INDEX_TOOL, e),
                        None,
                    )
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            SEARCH_TOOL => {
                let args = serde_json::Value::Object(arguments.unwrap_or_default());
                let params: SearchParams = serde_json::from_value(args).map_err(|e| {
                    McpError::new(
                        ErrorCode::INVALID_PARAMS,
                        format!("{}: invalid parameters: {}", SEARCH_TOOL, e),
                        None,
                    )
                })?;
                match search(&self.state, params).await {
                    Ok(response) => Ok(CallToolResult::success(vec![Content::text(
                        response.markdown,
                    )])),
                    Err(e) => Ok(CallToolResult::error(vec![Content::text(
                        e.message().to_string(),
                    )])),
                }
            }
            _ => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", name),
                None,
            )),
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "code-archive".to_string(),
                title: Some("Code Archive".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Semantic search over archived legacy codebases. Call index_codebase to \
                 pick up new, modified, and deleted files, then search_legacy_code with a \
                 natural language or code query. Scores are cosine distances: lower is closer."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.tools())))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools().into_iter().find(|t| t.name == name)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::RecursiveSplitter;
    use crate::coordinator::RunCoordinator;
    use crate::embedding::{DisabledEmbedder, Embedder};
    use crate::indexer::FileIndexer;
    use crate::query::QueryEngine;
    use crate::scanner::FileScanner;
    use crate::store::memory::InMemoryIndex;
    use async_trait::async_trait;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        fn model_name(&self) -> &str {
            "unit"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn bridge(root: std::path::PathBuf, embedder: Arc<dyn Embedder>) -> McpBridge {
        let index = Arc::new(InMemoryIndex::new());
        let indexer = FileIndexer::new(
            Arc::new(RecursiveSplitter::new(200, 20)),
            embedder.clone(),
            index.clone(),
            4,
        );
        let coordinator = RunCoordinator::new(
            vec![root],
            FileScanner::new(vec![".cbl".into()], vec!["copybooks/old".into()]),
            indexer,
            1,
        );
        McpBridge::new(AppState {
            coordinator: Arc::new(coordinator),
            query: QueryEngine::new(embedder, index, 5),
            embeddings_enabled: true,
        })
    }

    fn text_of(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    fn args(value: serde_json::Value) -> Option<serde_json::Map<String, serde_json::Value>> {
        match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn advertises_both_tools_with_schemas() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bridge = bridge(tmp.path().to_path_buf(), Arc::new(UnitEmbedder));

        let tools = bridge.tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec![INDEX_TOOL, SEARCH_TOOL]);

        let search_tool = bridge.get_tool(SEARCH_TOOL).unwrap();
        assert_eq!(search_tool.input_schema["required"][0], "query");
        assert!(bridge.get_tool("index").is_none());
        assert!(bridge.get_info().capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn index_returns_run_json_and_search_returns_markdown() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("PAYROLL.cbl"),
            "       IDENTIFICATION DIVISION.\n       PROGRAM-ID. PAYROLL.\n",
        )
        .unwrap();
        let bridge = bridge(tmp.path().to_path_buf(), Arc::new(UnitEmbedder));

        let run = bridge.dispatch(INDEX_TOOL, None).await.unwrap();
        assert_ne!(run.is_error, Some(true));
        let run: serde_json::Value = serde_json::from_str(&text_of(&run)).unwrap();
        assert_eq!(run["newFiles"], 1);
        assert_eq!(run["totalFiles"], 1);
        assert_eq!(run["errors"].as_array().unwrap().len(), 0);

        let found = bridge
            .dispatch(SEARCH_TOOL, args(serde_json::json!({ "query": "payroll program" })))
            .await
            .unwrap();
        assert_ne!(found.is_error, Some(true));
        let markdown = text_of(&found);
        assert!(markdown.contains("## Result 1 - DEFAULT"), "{}", markdown);
        assert!(markdown.contains("PAYROLL.cbl"), "{}", markdown);
    }

    #[tokio::test]
    async fn protocol_and_tool_errors_are_distinguished() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bridge = bridge(tmp.path().to_path_buf(), Arc::new(DisabledEmbedder));

        let err = bridge.dispatch("nope", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);

        let err = bridge
            .dispatch(SEARCH_TOOL, args(serde_json::json!({ "limit": 3 })))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let failed = bridge
            .dispatch(SEARCH_TOOL, args(serde_json::json!({ "query": "payroll" })))
            .await
            .unwrap();
        assert_eq!(failed.is_error, Some(true));
        assert!(text_of(&failed).contains(SEARCH_TOOL));
    }
}
