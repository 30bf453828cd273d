// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Adapters behind the domain's persistence and collaborator contracts.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** File and in-memory persistence, event bus, default collaborators

pub mod collaborators;
pub mod event_bus;
pub mod history_store;
pub mod model_store;
