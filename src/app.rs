//! Component wiring.
//!
//! Everything is constructed once from a [`Config`] and passed by handle:
//! the SQLite index, the configured embedder, the splitter, and the
//! coordinator and query engine built on top of them. There is no global
//! state; tests build the same pieces around substitutes.

use std::sync::Arc;

use anyhow::Result;

use crate::chunk::RecursiveSplitter;
use crate::config::Config;
use crate::coordinator::RunCoordinator;
use crate::embedding::{create_embedder, Embedder};
use crate::indexer::FileIndexer;
use crate::progress::RunProgressReporter;
use crate::query::QueryEngine;
use crate::store::sqlite::SqliteIndex;
use crate::store::VectorIndex;

pub struct Archive {
    pub index: Arc<SqliteIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub coordinator: Arc<RunCoordinator>,
    pub query: QueryEngine,
}

impl Archive {
    pub async fn open(config: &Config, progress: Arc<dyn RunProgressReporter>) -> Result<Self> {
        let index = Arc::new(SqliteIndex::open(&config.db.path).await?);
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
        let splitter = Arc::new(RecursiveSplitter::from_config(&config.chunking));

        let dyn_index: Arc<dyn VectorIndex> = index.clone();
        let indexer = FileIndexer::new(
            splitter,
            embedder.clone(),
            dyn_index.clone(),
            config.embedding.batch_size,
        );
        let coordinator =
            Arc::new(RunCoordinator::from_config(config, indexer).with_progress(progress));
        let query = QueryEngine::new(
            embedder.clone(),
            dyn_index,
            config.retrieval.default_limit,
        );

        Ok(Self {
            index,
            embedder,
            coordinator,
            query,
        })
    }

    pub async fn close(&self) {
        self.index.close().await;
    }
}
