//! Heuristics module.
//!
//! This module exports the improvement heuristics used to prepare parents.

pub mod local_search;

pub use local_search::*;
