//! Standalone server over the orchestration core.

use anyhow::Result;

use clinflow_core::config::CoreConfig;
use clinflow_core::logging::init_structured_logging;
use clinflow_core::system::CoreSystem;

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();

    let system = CoreSystem::new(CoreConfig::from_env()?);
    system.spawn_watchdog();

    let listener = tokio::net::TcpListener::bind(&system.config.bind_address).await?;
    tracing::info!(address = %system.config.bind_address, "server listening");
    axum::serve(listener, system.router()).await?;
    Ok(())
}
