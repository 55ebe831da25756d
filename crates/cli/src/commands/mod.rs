//! CLI command implementations

pub mod evaluate;
pub mod inspect;

use anyhow::{Context, Result};
use loadaware_lib::LoadAwareArgs;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse a JSON input file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Policy from `path`, or the defaults. The policy is validated either way.
pub fn load_args(path: Option<&Path>) -> Result<LoadAwareArgs> {
    let args = match path {
        Some(path) => read_json(path)?,
        None => LoadAwareArgs::default(),
    };
    args.validate().context("invalid load-aware args")?;
    Ok(args)
}
