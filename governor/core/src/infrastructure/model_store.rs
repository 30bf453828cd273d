// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Causal Model Stores
//!
//! Persist the installed CPD set between process lifetimes. The file store
//! writes to a sibling temp file and renames it over the target, so a reader
//! sees either the previous set or the new one.

use crate::domain::causal::TabularCpd;
use crate::domain::repository::{CausalModelRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCpdSet {
    saved_at: DateTime<Utc>,
    cpds: Vec<TabularCpd>,
}

pub struct FileCausalModelRepository {
    path: PathBuf,
}

impl FileCausalModelRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CausalModelRepository for FileCausalModelRepository {
    async fn save(&self, cpds: &[TabularCpd]) -> Result<(), RepositoryError> {
        let stored = StoredCpdSet {
            saved_at: Utc::now(),
            cpds: cpds.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&stored)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, &self.path).await?;

        tracing::info!(path = ?self.path, cpds = cpds.len(), "Causal model saved");
        Ok(())
    }

    async fn load(&self) -> Result<Option<Vec<TabularCpd>>, RepositoryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = ?self.path,
                    "Causal model file not found; model stays uninitialized"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let stored: StoredCpdSet = serde_json::from_slice(&bytes)?;
        tracing::info!(
            path = ?self.path,
            cpds = stored.cpds.len(),
            saved_at = %stored.saved_at,
            "Causal model loaded"
        );
        Ok(Some(stored.cpds))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCausalModelRepository {
    cpds: Arc<RwLock<Option<Vec<TabularCpd>>>>,
}

impl InMemoryCausalModelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CausalModelRepository for InMemoryCausalModelRepository {
    async fn save(&self, cpds: &[TabularCpd]) -> Result<(), RepositoryError> {
        *self.cpds.write() = Some(cpds.to_vec());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Vec<TabularCpd>>, RepositoryError> {
        Ok(self.cpds.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpds() -> Vec<TabularCpd> {
        vec![
            TabularCpd::prior("ecocentric", vec![0.4, 0.6]),
            TabularCpd::new(
                "final_score",
                vec!["ecocentric".to_string()],
                vec![vec![0.7, 0.2], vec![0.3, 0.8]],
            ),
        ]
    }

    #[tokio::test]
    async fn test_file_model_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileCausalModelRepository::new(dir.path().join("model").join("cpds.json"));

        assert_eq!(repo.load().await.unwrap(), None);

        repo.save(&cpds()).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Some(cpds()));
        assert!(!repo.temp_path().exists());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_set() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileCausalModelRepository::new(dir.path().join("cpds.json"));
        repo.save(&cpds()).await.unwrap();

        let replacement = vec![TabularCpd::prior("final_score", vec![0.5, 0.5])];
        repo.save(&replacement).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpds.json");
        tokio::fs::write(&path, b"{").await.unwrap();
        let repo = FileCausalModelRepository::new(&path);
        assert!(matches!(repo.load().await, Err(RepositoryError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_in_memory_model_store() {
        let repo = InMemoryCausalModelRepository::new();
        assert_eq!(repo.load().await.unwrap(), None);
        repo.save(&cpds()).await.unwrap();
        assert_eq!(repo.load().await.unwrap().map(|c| c.len()), Some(2));
    }
}
