//! Load-aware scheduler extender
//!
//! Serves the filter and score plugins over HTTP for a scheduler that
//! delegates node evaluation to an extender.

pub mod api;
pub mod config;
