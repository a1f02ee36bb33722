//! # Code Archive
//!
//! Incremental semantic indexing and search over legacy source trees.
//!
//! Configured project roots are scanned for source files, each file is split
//! into language-aware units, every unit is embedded, and the vectors are
//! stored in a single table. Later runs only touch files that were added,
//! modified, or removed since the last run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ FileScanner │──▶│  Reconcile  │──▶│ FileIndexer │
//! │  (roots)    │   │ add/upd/del │   │ split+embed │
//! └─────────────┘   └─────────────┘   └──────┬──────┘
//!                                            ▼
//!                 ┌──────────┐         ┌────────────┐
//!                 │  Query   │◀────────│ VectorIndex│
//!                 │  Engine  │         │  (SQLite)  │
//!                 └────┬─────┘         └────────────┘
//!              ┌───────┴───────┐
//!              ▼               ▼
//!         ┌────────┐     ┌──────────┐
//!         │  CLI   │     │HTTP + MCP│
//!         │ (carc) │     │  tools   │
//!         └────────┘     └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, environment overrides, validation |
//! | [`models`] | Core data types and project identity |
//! | [`error`] | Typed scan, per-file, and query failures |
//! | [`scanner`] | Project root walking with extension and exclusion filters |
//! | [`reconcile`] | Diff of indexed state against the filesystem |
//! | [`chunk`] | Language-aware recursive splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector index trait with in-memory and SQLite backends |
//! | [`indexer`] | Single-file read → split → embed → store |
//! | [`coordinator`] | Indexing run state machine |
//! | [`query`] | Semantic search |
//! | [`progress`] | Run progress on stderr |
//! | [`stats`] | Index statistics |
//! | [`render`] | Text and markdown output |
//! | [`server`] | HTTP tool server |
//! | [`mcp`] | MCP bridge over Streamable HTTP |
//! | [`app`] | Component wiring from a config |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod app;
pub mod chunk;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod mcp;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod query;
pub mod reconcile;
pub mod render;
pub mod scanner;
pub mod server;
pub mod stats;
pub mod store;
