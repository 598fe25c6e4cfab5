//! Chat Relay Server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p chat-relay
//! ```
//!
//! Configuration is loaded from environment variables.

use chat_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration before tracing so the log format can be honoured
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    let tracing_config = TracingConfig::for_settings(config.app.env, config.log_format);
    if let Err(e) = try_init_tracing_with_config(tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        app = %config.app.name,
        env = ?config.app.env,
        transport = %config.server.transport,
        address = %config.server.address(),
        "Starting Chat Relay Server..."
    );

    // Run the relay
    if let Err(e) = chat_relay::run(config).await {
        error!(error = %e, code = e.error_code(), "Relay failed to start");
        std::process::exit(1);
    }
}
