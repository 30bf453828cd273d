// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the two pieces of durable governor state.
//! Interfaces live in the domain layer, implementations in
//! `crate::infrastructure`.
//!
//! | Trait | State | Implementations |
//! |-------|-------|----------------|
//! | `DecisionHistoryRepository` | Append-only `DecisionRecord` log | `FileDecisionHistoryRepository`, `InMemoryDecisionHistoryRepository` |
//! | `CausalModelRepository` | Installed CPD set | `FileCausalModelRepository`, `InMemoryCausalModelRepository` |
//!
//! Both are loaded independently at startup; a missing backing file is not an
//! error (empty history / no CPD set).

use crate::domain::causal::TabularCpd;
use crate::domain::history::DecisionRecord;
use async_trait::async_trait;

#[async_trait]
pub trait DecisionHistoryRepository: Send + Sync {
    /// Durably append one record. Atomic per record.
    async fn append(&self, record: &DecisionRecord) -> Result<(), RepositoryError>;

    /// Full history in append order.
    async fn load(&self) -> Result<Vec<DecisionRecord>, RepositoryError>;
}

#[async_trait]
pub trait CausalModelRepository: Send + Sync {
    /// Replace the persisted CPD set.
    async fn save(&self, cpds: &[TabularCpd]) -> Result<(), RepositoryError>;

    /// Persisted CPD set, or `None` if nothing has been saved yet.
    async fn load(&self) -> Result<Option<Vec<TabularCpd>>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
