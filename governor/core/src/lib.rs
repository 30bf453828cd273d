// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Prism Governor Core
//!
//! Multi-criteria decision evaluation: pluggable evaluators, weighted
//! aggregation, online weight adaptation, contextual weight rules and a
//! discrete causal model over the evaluator outputs.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, application services and infrastructure adapters

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
