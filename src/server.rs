//! HTTP tool server.
//!
//! Exposes the two archive operations to agent hosts, both as plain JSON
//! routes and as an MCP Streamable HTTP endpoint (see [`crate::mcp`]).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (version and current run phase) |
//! | `GET`  | `/tools/list` | List tools with parameter schemas |
//! | `POST` | `/tools/index_codebase` | Run one incremental indexing pass |
//! | `POST` | `/tools/search_legacy_code` | Semantic search over indexed code |
//! | `*`    | `/mcp` | MCP JSON-RPC (`tools/list`, `tools/call`) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must be a string" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `embeddings_disabled` (400),
//! `tool_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.
//!
//! # MCP client configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "code-archive": { "url": "http://127.0.0.1:7341/mcp" }
//!   }
//! }
//! ```

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app::Archive;
use crate::config::Config;
use crate::coordinator::{RunCoordinator, RunPhase};
use crate::error::QueryError;
use crate::mcp;
use crate::models::SearchResult;
use crate::progress::NoProgress;
use crate::query::QueryEngine;
use crate::render::search_markdown;

pub const INDEX_TOOL: &str = "index_codebase";
pub const SEARCH_TOOL: &str = "search_legacy_code";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RunCoordinator>,
    pub query: QueryEngine,
    pub embeddings_enabled: bool,
}

/// Starts the tool server (`carc serve mcp`).
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let archive = Archive::open(config, Arc::new(NoProgress)).await?;
    let state = AppState {
        coordinator: archive.coordinator.clone(),
        query: archive.query.clone(),
        embeddings_enabled: config.embedding.is_enabled(),
    };

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "tool server listening");
    println!("Tool server listening on http://{}", bind_addr);
    println!("MCP endpoint: http://{}/mcp", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .nest_service("/mcp", mcp::service(state.clone()))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error".to_string(),
        message: message.into(),
    }
}

fn embeddings_disabled(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "embeddings_disabled".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub phase: RunPhase,
}

pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        phase: state.coordinator.phase(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub read_only: bool,
    pub parameters: serde_json::Value,
}

#[derive(Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolInfo>,
}

/// Descriptors for every tool, shared by `/tools/list` and the MCP bridge.
pub fn tool_catalog() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: INDEX_TOOL.to_string(),
            description: "Scan every configured project root and incrementally index \
                new, modified, and deleted files."
                .to_string(),
            read_only: false,
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolInfo {
            name: SEARCH_TOOL.to_string(),
            description: "Search indexed code by semantic similarity. Returns ranked \
                snippets with file, project, language, and cosine distance (lower is closer)."
                .to_string(),
            read_only: true,
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Natural language or code query" },
                    "limit": { "type": "integer", "default": 5, "minimum": 1, "maximum": 20 },
                    "project_filter": { "type": "string", "description": "Project root path to restrict results to" }
                },
                "required": ["query"]
            }),
        },
    ]
}

pub async fn handle_list_tools() -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: tool_catalog(),
    })
}

// ============ POST /tools/{name} ============

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub project_filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub markdown: String,
}

pub async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<serde_json::Value>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let params = body.map(|Json(v)| v).unwrap_or(serde_json::Value::Null);
    match name.as_str() {
        INDEX_TOOL => {
            let result = state.coordinator.run().await;
            serde_json::to_value(result)
                .map(Json)
                .map_err(|e| tool_error(format!("{}: {}", INDEX_TOOL, e)))
        }
        SEARCH_TOOL => {
            let params: SearchParams = serde_json::from_value(params)
                .map_err(|e| bad_request(format!("{}: invalid parameters: {}", SEARCH_TOOL, e)))?;
            let response = search(&state, params).await?;
            serde_json::to_value(response)
                .map(Json)
                .map_err(|e| tool_error(format!("{}: {}", SEARCH_TOOL, e)))
        }
        _ => Err(not_found(format!("no tool registered with name: {}", name))),
    }
}

pub async fn search(state: &AppState, params: SearchParams) -> Result<SearchResponse, AppError> {
    let results = state
        .query
        .search(&params.query, params.limit, params.project_filter.as_deref())
        .await
        .map_err(|e| match e {
            QueryError::Embed(_) if !state.embeddings_enabled => {
                embeddings_disabled(format!("{}: {}", SEARCH_TOOL, e))
            }
            other => tool_error(format!("{}: {}", SEARCH_TOOL, other)),
        })?;

    let markdown = search_markdown(&params.query, &results);
    Ok(SearchResponse { results, markdown })
}
