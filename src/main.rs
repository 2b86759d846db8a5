//! Mail lookup gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Postfix ──socketmap──▶ ┌──────────┐    ┌───────────┐
//!                          │ net      │───▶│ protocol  │──┐
//!   Dovecot ──dict───────▶ │ listener │    │ codecs    │  │
//!                          └──────────┘    └───────────┘  │   ┌─────────┐
//!                                                         ├──▶│ backend │──▶ lookup service
//!   nginx ──auth_http────▶ ┌──────────┐                   │   └─────────┘
//!                          │ http     │───────────────────┘
//!                          │ server   │
//!                          └──────────┘
//! ```
//!
//! Every lookup becomes one `(verb, object)` query; the reply is rendered
//! back into whatever the asking daemon expects.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use lookup_gateway::config::load_config;
use lookup_gateway::lifecycle::{self, signals, Shutdown};
use lookup_gateway::observability::{logging, metrics};
use lookup_gateway::HttpBackend;

#[derive(Parser)]
#[command(name = "lookup-gateway")]
#[command(about = "Mail lookup gateway for Postfix, Dovecot and nginx", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "/etc/lookup-gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    if args.check {
        println!("{}: configuration OK", args.config.display());
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lookup-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    tracing::info!(
        backend_url = %config.backend.url,
        socketmap = config.socketmap.enabled,
        dict = config.dict.enabled,
        http = config.http.enabled,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let mut running = lifecycle::start(&config, backend, &shutdown).await?;

    let stopped = tokio::select! {
        signal = signals::wait_for_signal() => {
            signal?;
            None
        }
        err = running.listener_stopped() => {
            tracing::error!(error = %err, "Listener failed, shutting down");
            Some(err)
        }
    };
    shutdown.trigger();

    running.wait(Duration::from_secs(config.drain_timeout_secs)).await?;
    if let Some(err) = stopped {
        return Err(err.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
