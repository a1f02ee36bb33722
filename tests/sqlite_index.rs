//! SQLite backend behaviour, including reads before the table exists.

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use code_archive::chunk::RecursiveSplitter;
use code_archive::coordinator::RunCoordinator;
use code_archive::embedding::Embedder;
use code_archive::indexer::FileIndexer;
use code_archive::migrate::{ensure_schema, table_exists};
use code_archive::models::{project_id, IndexedUnit};
use code_archive::scanner::FileScanner;
use code_archive::stats::collect_stats;
use code_archive::store::sqlite::SqliteIndex;
use code_archive::store::VectorIndex;

fn unit(id: &str, file: &str, project: &str, vector: Vec<f32>) -> IndexedUnit {
    IndexedUnit {
        id: id.to_string(),
        vector,
        content: format!("body of {}", id),
        file_path: file.to_string(),
        project_id: project_id(project),
        project_path: project.to_string(),
        language: "java".to_string(),
        last_modified: 1_700_000_000.25,
    }
}

async fn open(tmp: &TempDir) -> SqliteIndex {
    SqliteIndex::open(&tmp.path().join("data/archive.sqlite"))
        .await
        .unwrap()
}

#[tokio::test]
async fn fresh_database_reads_as_empty() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;

    assert!(!table_exists(index.pool()).await.unwrap());
    assert!(index.indexed_files().await.unwrap().is_empty());
    assert!(index.search(&[1.0, 0.0], 5, None).await.unwrap().is_empty());
    assert_eq!(index.delete_by_file_path("/p/A.java").await.unwrap(), 0);
    assert_eq!(index.count_units().await.unwrap(), 0);
    assert_eq!(collect_stats(index.pool()).await.unwrap().total_units, 0);
}

#[tokio::test]
async fn upsert_creates_table_and_round_trips_rows() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;

    let row = unit("u1", "/p/A.java", "/p", vec![0.5, -1.25, 3.0]);
    index.upsert(&[row.clone()]).await.unwrap();

    assert!(table_exists(index.pool()).await.unwrap());
    let hits = index.search(&[0.5, -1.25, 3.0], 5, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].unit, row);
    assert!(hits[0].score.abs() < 1e-6);

    // Same id again replaces rather than duplicates.
    let mut changed = row.clone();
    changed.content = "rewritten".to_string();
    index.upsert(&[changed]).await.unwrap();
    assert_eq!(index.count_units().await.unwrap(), 1);
}

#[tokio::test]
async fn search_orders_ascending_and_filters_by_project() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    index
        .upsert(&[
            unit("near", "/p/A.java", "/p", vec![1.0, 0.05]),
            unit("far", "/p/B.java", "/p", vec![0.0, 1.0]),
            unit("mid", "/q/C.java", "/q", vec![1.0, 0.5]),
        ])
        .await
        .unwrap();

    let all = index.search(&[1.0, 0.0], 10, None).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|h| h.unit.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid", "far"]);

    let limited = index.search(&[1.0, 0.0], 1, None).await.unwrap();
    assert_eq!(limited.len(), 1);

    let q_only = index
        .search(&[1.0, 0.0], 10, Some(&project_id("/q")))
        .await
        .unwrap();
    assert_eq!(q_only.len(), 1);
    assert_eq!(q_only[0].unit.project_path, "/q");
}

#[tokio::test]
async fn indexed_files_and_delete_work_per_path() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    index
        .upsert(&[
            unit("1", "/p/A.java", "/p", vec![1.0]),
            unit("2", "/p/A.java", "/p", vec![1.0]),
            unit("3", "/p/B.java", "/p", vec![1.0]),
        ])
        .await
        .unwrap();

    let files = index.indexed_files().await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file_path, "/p/A.java");
    assert_eq!(files[0].last_modified, 1_700_000_000.25);
    assert_eq!(files[0].project_id, project_id("/p"));

    assert_eq!(index.delete_by_file_path("/p/A.java").await.unwrap(), 2);
    assert_eq!(index.count_units().await.unwrap(), 1);

    let stats = collect_stats(index.pool()).await.unwrap();
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.projects.len(), 1);
    assert_eq!(stats.projects[0].project_path, "/p");
}

#[tokio::test]
async fn search_fails_when_stored_dimensions_differ() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    index
        .upsert(&[unit("u1", "/p/A.java", "/p", vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();

    let err = index.search(&[1.0, 0.0], 5, None).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("dimension mismatch"), "{}", message);
    assert!(message.contains("/p/A.java"), "{}", message);
}

#[tokio::test]
async fn ensure_schema_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    ensure_schema(index.pool()).await.unwrap();
    ensure_schema(index.pool()).await.unwrap();
    assert!(table_exists(index.pool()).await.unwrap());
    assert_eq!(index.count_units().await.unwrap(), 0);
}

struct LengthEmbedder;

#[async_trait]
impl Embedder for LengthEmbedder {
    fn model_name(&self) -> &str {
        "length"
    }
    fn dims(&self) -> usize {
        2
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32, 1.0])
            .collect())
    }
}

#[tokio::test]
async fn runs_are_idempotent_on_disk() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("legacy");
    fs::create_dir_all(root.join("web")).unwrap();
    fs::write(root.join("web/Login.vue"), "<template><form></form></template>\n").unwrap();
    fs::write(root.join("web/api.js"), "export const get = () => fetch('/api');\n").unwrap();

    let index = Arc::new(open(&tmp).await);
    let indexer = FileIndexer::new(
        Arc::new(RecursiveSplitter::new(500, 50)),
        Arc::new(LengthEmbedder),
        index.clone(),
        8,
    );
    let coord = RunCoordinator::new(
        vec![root],
        FileScanner::new(vec![".vue".into(), ".js".into()], vec!["node_modules".into()]),
        indexer,
        2,
    );

    let first = coord.run().await;
    assert_eq!(first.new_files, 2);
    assert!(first.errors.is_empty(), "{:?}", first.errors);

    let second = coord.run().await;
    assert_eq!(second.new_files, 0);
    assert_eq!(second.updated_files, 0);
    assert_eq!(second.deleted_files, 0);
    assert_eq!(index.count_units().await.unwrap(), first.total_chunks);

    let languages: Vec<String> = index
        .search(&[1.0, 1.0], 10, None)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.unit.language)
        .collect();
    assert!(languages.contains(&"vue".to_string()));
    assert!(languages.contains(&"js".to_string()));
}
