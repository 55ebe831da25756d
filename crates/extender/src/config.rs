//! Extender configuration

use anyhow::{Context, Result};
use loadaware_lib::LoadAwareArgs;
use serde::Deserialize;
use std::path::Path;

/// Service settings read from `LOADAWARE_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// HTTP port for the extender endpoints
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// JSON file holding the load-aware policy; defaults apply when unset
    #[serde(default)]
    pub args_file: Option<String>,
}

fn default_listen_port() -> u16 {
    8080
}

/// Everything the extender needs at startup
#[derive(Debug, Clone)]
pub struct ExtenderConfig {
    pub listen_port: u16,
    pub args: LoadAwareArgs,
}

impl ExtenderConfig {
    /// Load settings from the environment and the policy from its file.
    /// An invalid policy is an error.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("LOADAWARE").try_parsing(true))
            .build()?;
        let service: ServiceSettings = settings
            .try_deserialize()
            .context("invalid LOADAWARE_* settings")?;

        let args = match &service.args_file {
            Some(path) => load_args(Path::new(path))?,
            None => LoadAwareArgs::default(),
        };
        args.validate().context("invalid load-aware args")?;

        Ok(Self {
            listen_port: service.listen_port,
            args,
        })
    }
}

/// Read a policy file; omitted fields keep their defaults
pub fn load_args(path: &Path) -> Result<LoadAwareArgs> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read args file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse args file {}", path.display()))
}
