// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Evaluator Contract
//!
//! An evaluator ("prism") scores one independent dimension of a proposed
//! action on a continuous `0.0 – 1.0` scale and reports the metrics it used.
//! Evaluators are compiled in and registered through
//! [`crate::application::registry::EvaluatorRegistry`]; nothing is loaded
//! dynamically.
//!
//! | Type | Description |
//! |------|-------------|
//! | `EvaluatorId` | Validated identifier (`[a-z][a-z0-9_]*`) |
//! | `InputData` | Flat JSON mapping handed to one evaluator |
//! | `EvaluatorResult` | Score + metrics bundle |
//! | `EvaluatorCatalog` | Ordered list of compiled-in constructors |
//!
//! Evaluators must be pure functions of their input: the aggregation engine
//! runs them concurrently and in no particular order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Flat mapping of named observations handed to a single evaluator.
pub type InputData = serde_json::Map<String, Value>;

/// Metrics reported alongside a score, keyed by metric name.
pub type Metrics = BTreeMap<String, Value>;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static pattern is valid"))
}

/// Identifier of an evaluator, also used as its weight key and causal variable name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvaluatorId(String);

impl EvaluatorId {
    pub fn new(id: impl Into<String>) -> Result<Self, EvaluatorError> {
        let id = id.into();
        if id_pattern().is_match(&id) {
            Ok(Self(id))
        } else {
            Err(EvaluatorError::InvalidId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvaluatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EvaluatorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EvaluatorId {
    type Error = EvaluatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EvaluatorId> for String {
    fn from(id: EvaluatorId) -> Self {
        id.0
    }
}

/// Output of one evaluator for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorResult {
    /// Canonically in `[0.0, 1.0]`; not clamped.
    pub score: f64,

    #[serde(default)]
    pub metrics: Metrics,
}

impl EvaluatorResult {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            metrics: Metrics::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluatorError {
    #[error("Invalid evaluator id '{0}': must match [a-z][a-z0-9_]*")]
    InvalidId(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Evaluator construction failed: {0}")]
    Construction(String),
}

/// Capability every evaluator plugin exposes.
pub trait Evaluator: Send + Sync {
    /// Identifier under which the evaluator is registered and weighted.
    fn id(&self) -> &EvaluatorId;

    /// Score the given flat mapping.
    fn evaluate(&self, input: &InputData) -> Result<EvaluatorResult, EvaluatorError>;
}

/// Constructor for a compiled-in evaluator.
pub type EvaluatorFactory = fn() -> Result<Arc<dyn Evaluator>, EvaluatorError>;

/// One discoverable evaluator: the id it is listed under and how to build it.
#[derive(Clone)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub factory: EvaluatorFactory,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry").field("id", &self.id).finish()
    }
}

/// Ordered, build-time list of evaluator implementations.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorCatalog {
    entries: Vec<CatalogEntry>,
}

impl EvaluatorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &'static str, factory: EvaluatorFactory) -> Self {
        self.entries.push(CatalogEntry { id, factory });
        self
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_id_validation() {
        assert!(EvaluatorId::new("human_centric").is_ok());
        assert!(EvaluatorId::new("prism2").is_ok());
        assert!(matches!(EvaluatorId::new(""), Err(EvaluatorError::InvalidId(_))));
        assert!(EvaluatorId::new("HumanCentric").is_err());
        assert!(EvaluatorId::new("2fast").is_err());
        assert!(EvaluatorId::new("has space").is_err());
    }

    #[test]
    fn test_evaluator_id_serde_rejects_invalid() {
        let ok: EvaluatorId = serde_json::from_str("\"ecocentric\"").unwrap();
        assert_eq!(ok.as_str(), "ecocentric");
        assert!(serde_json::from_str::<EvaluatorId>("\"Not-Valid\"").is_err());
    }

    #[test]
    fn test_result_builder_and_serialization() {
        let result = EvaluatorResult::new(0.8).with_metric("carbon_footprint", 0.2);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["score"], 0.8);
        assert_eq!(json["metrics"]["carbon_footprint"], 0.2);
    }

    #[test]
    fn test_catalog_lookup_preserves_order() {
        fn build() -> Result<Arc<dyn Evaluator>, EvaluatorError> {
            Err(EvaluatorError::Construction("unused".to_string()))
        }
        let catalog = EvaluatorCatalog::new().with("b", build).with("a", build);
        let ids: Vec<_> = catalog.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(catalog.find("a").is_some());
        assert!(catalog.find("c").is_none());
    }
}
