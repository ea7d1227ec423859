use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::info;

use nfchecker_core::config::AppConfig;
use nfchecker_jobs::RefreshLoop;
use nfchecker_session::GraphqlTokenMinter;
use nfchecker_store::MemoryStore;

/// Run the supervised refresh loop until Ctrl+C.
pub async fn run(config: AppConfig, store: Arc<MemoryStore>) -> Result<()> {
    let minter = Arc::new(GraphqlTokenMinter::new(config.token.clone())?);
    let refresher = RefreshLoop::new(store, minter, config.refresh.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
    let handle = tokio::spawn(async move { refresher.run(shutdown_rx).await });

    info!("refresh loop running, press Ctrl+C to stop");
    signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(());
    let _ = handle.await;

    info!("shutdown complete");
    Ok(())
}
