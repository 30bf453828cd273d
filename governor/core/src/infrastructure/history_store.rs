// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Decision History Stores
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and reload the append-only decision history
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **FileDecisionHistoryRepository** - JSON Lines file, one record per line
//! - **InMemoryDecisionHistoryRepository** - Vec-backed, for tests and embedding

use crate::domain::history::DecisionRecord;
use crate::domain::repository::{DecisionHistoryRepository, RepositoryError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// JSON Lines history file.
///
/// Each append serializes the record to a single line and writes it with one
/// `write_all` followed by `sync_data`, under a mutex, so concurrent appends
/// never interleave and a completed append survives a crash.
pub struct FileDecisionHistoryRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDecisionHistoryRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DecisionHistoryRepository for FileDecisionHistoryRepository {
    async fn append(&self, record: &DecisionRecord) -> Result<(), RepositoryError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.sync_data().await?;

        tracing::debug!(decision_id = %record.id, path = ?self.path, "Decision record appended");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<DecisionRecord>, RepositoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = ?self.path,
                    "Decision history file not found; starting with empty history"
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| RepositoryError::Corrupt {
                line: index + 1,
                reason: e.to_string(),
            })?;
            records.push(record);
        }

        tracing::info!(count = records.len(), path = ?self.path, "Decision history loaded");
        Ok(records)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDecisionHistoryRepository {
    records: Arc<RwLock<Vec<DecisionRecord>>>,
}

impl InMemoryDecisionHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl DecisionHistoryRepository for InMemoryDecisionHistoryRepository {
    async fn append(&self, record: &DecisionRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<DecisionRecord>, RepositoryError> {
        Ok(self.records.read().clone())
    }
}
