//! In-memory [`VectorIndex`] implementation.
//!
//! Rows live in a `Vec` behind `std::sync::RwLock`. Vector search is
//! brute-force cosine distance over all stored rows. Nothing is persisted.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{IndexedFile, IndexedUnit};

use super::{check_dims, ScoredUnit, VectorIndex};

#[derive(Default)]
pub struct InMemoryIndex {
    rows: RwLock<Vec<IndexedUnit>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row for one file.
    pub fn units_for_file(&self, file_path: &str) -> Result<Vec<IndexedUnit>> {
        Ok(self
            .read()?
            .iter()
            .filter(|u| u.file_path == file_path)
            .cloned()
            .collect())
    }

    /// Snapshot of every row.
    pub fn all_units(&self) -> Result<Vec<IndexedUnit>> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<IndexedUnit>>> {
        self.rows
            .read()
            .map_err(|_| anyhow::anyhow!("in-memory index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<IndexedUnit>>> {
        self.rows
            .write()
            .map_err(|_| anyhow::anyhow!("in-memory index lock poisoned"))
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, units: &[IndexedUnit]) -> Result<()> {
        let mut rows = self.write()?;
        for unit in units {
            match rows.iter_mut().find(|r| r.id == unit.id) {
                Some(existing) => *existing = unit.clone(),
                None => rows.push(unit.clone()),
            }
        }
        Ok(())
    }

    async fn delete_by_file_path(&self, file_path: &str) -> Result<usize> {
        let mut rows = self.write()?;
        let before = rows.len();
        rows.retain(|r| r.file_path != file_path);
        Ok(before - rows.len())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        project_id: Option<&str>,
    ) -> Result<Vec<ScoredUnit>> {
        let rows = self.read()?;
        let mut scored: Vec<ScoredUnit> = rows
            .iter()
            .filter(|r| project_id.map_or(true, |pid| r.project_id == pid))
            .map(|r| {
                check_dims(query_vec, r)?;
                Ok(ScoredUnit {
                    score: cosine_distance(query_vec, &r.vector),
                    unit: r.clone(),
                })
            })
            .collect::<Result<_>>()?;

        scored.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn indexed_files(&self) -> Result<Vec<IndexedFile>> {
        let rows = self.read()?;
        let mut files: BTreeMap<&str, IndexedFile> = BTreeMap::new();
        for r in rows.iter() {
            files.entry(r.file_path.as_str()).or_insert_with(|| IndexedFile {
                file_path: r.file_path.clone(),
                last_modified: r.last_modified,
                project_path: r.project_path.clone(),
                project_id: r.project_id.clone(),
            });
        }
        Ok(files.into_values().collect())
    }

    async fn count_units(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project_id;

    fn unit(id: &str, file: &str, project: &str, vector: Vec<f32>) -> IndexedUnit {
        IndexedUnit {
            id: id.to_string(),
            vector,
            content: format!("content of {}", id),
            file_path: file.to_string(),
            project_id: project_id(project),
            project_path: project.to_string(),
            language: "ts".to_string(),
            last_modified: 100.0,
        }
    }

    #[tokio::test]
    async fn delete_removes_all_rows_of_a_file() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                unit("1", "/p/A.ts", "/p", vec![1.0, 0.0]),
                unit("2", "/p/A.ts", "/p", vec![0.0, 1.0]),
                unit("3", "/p/B.ts", "/p", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(index.delete_by_file_path("/p/A.ts").await.unwrap(), 2);
        assert_eq!(index.count_units().await.unwrap(), 1);
        assert_eq!(index.delete_by_file_path("/p/missing.ts").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_orders_by_distance_and_filters_project() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                unit("near", "/p/A.ts", "/p", vec![1.0, 0.1]),
                unit("far", "/p/B.ts", "/p", vec![0.0, 1.0]),
                unit("other", "/q/C.ts", "/q", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let all = index.search(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].score <= w[1].score));

        let scoped = index
            .search(&[1.0, 0.0], 10, Some(&project_id("/p")))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 2);
        assert_eq!(scoped[0].unit.id, "near");
    }

    #[tokio::test]
    async fn indexed_files_is_distinct_per_path() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                unit("1", "/p/A.ts", "/p", vec![1.0]),
                unit("2", "/p/A.ts", "/p", vec![1.0]),
                unit("3", "/p/B.ts", "/p", vec![1.0]),
            ])
            .await
            .unwrap();
        let files = index.indexed_files().await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_path, "/p/A.ts");
    }

    #[tokio::test]
    async fn search_rejects_vectors_of_another_dimension() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[unit("old", "/p/A.ts", "/p", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let err = index.search(&[1.0, 0.0], 5, None).await.unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"), "{}", err);

        // Rows outside the project filter are not compared.
        let scoped = index
            .search(&[1.0, 0.0], 5, Some(&project_id("/q")))
            .await
            .unwrap();
        assert!(scoped.is_empty());
    }
}
