//! Relay server setup
//!
//! Binds the listening socket and runs the accept loop. Each accepted stream
//! gets its own task running a [`SessionHandler`](crate::session::SessionHandler).

mod listener;
mod state;

pub use listener::RelayServer;
pub use state::RelayState;

use chat_common::{AppConfig, AppResult};

/// Bind according to `config` and serve until the process is interrupted
pub async fn run(config: AppConfig) -> AppResult<()> {
    let server = RelayServer::bind(config).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    Ok(())
}
