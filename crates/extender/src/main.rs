//! Load-aware scheduler extender
//!
//! Runs next to the scheduler and answers filter and prioritize calls
//! using the node usage reported by node agents.

use anyhow::Result;
use loadaware_extender::{api, config};
use loadaware_lib::{LoadAware, LoadAwareMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXTENDER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting loadaware-extender");

    let config = config::ExtenderConfig::load()?;
    info!(
        listen_port = config.listen_port,
        node_metric_expiration_seconds = config.args.node_metric_expiration_seconds,
        "Extender configured"
    );

    let metrics = LoadAwareMetrics::new();
    let logger = StructuredLogger::new("loadaware-extender");
    logger.log_startup(EXTENDER_VERSION, config.listen_port);

    let app_state = Arc::new(api::AppState::new(
        LoadAware::new(config.args),
        metrics,
        logger.clone(),
    ));
    app_state.set_ready(true);

    let server = tokio::spawn(api::serve(config.listen_port, app_state.clone()));

    tokio::select! {
        result = server => {
            app_state.set_ready(false);
            match result {
                Ok(Ok(())) => logger.log_shutdown("server stopped"),
                Ok(Err(err)) => {
                    error!(error = %err, "Extender server failed");
                    return Err(err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            app_state.set_ready(false);
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
