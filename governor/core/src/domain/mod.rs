// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types, invariants and persistence contracts of the governor.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and algorithms with no runtime or I/O dependencies

pub mod causal;
pub mod collaborators;
pub mod config;
pub mod evaluator;
pub mod events;
pub mod history;
pub mod report;
pub mod repository;
pub mod rules;
pub mod weights;
