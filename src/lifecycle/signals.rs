//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown.

use tokio::signal::unix::{signal, SignalKind};

/// Wait for SIGINT or SIGTERM and return the signal's name.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = terminate.recv() => "SIGTERM",
        _ = interrupt.recv() => "SIGINT",
    };
    tracing::info!(signal = name, "Shutdown signal received");
    Ok(name)
}
