// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Prism Governor Prisms
//!
//! Compiled-in evaluators for the five built-in ethical dimensions, plus the
//! default weights and causal structure that pair with them.
//!
//! # Architecture
//!
//! - **Layer:** Plugin Layer
//! - **Purpose:** Evaluator implementations registered through the core catalog

pub mod catalog;
pub mod fixed;
pub mod indicator;

pub use catalog::{builtin_catalog, default_causal_structure, default_config, default_weights};
pub use fixed::FixedScorePrism;
pub use indicator::{Indicator, IndicatorPrism, Polarity};
