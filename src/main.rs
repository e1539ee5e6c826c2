//! Service gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ routing ──▶ forwarding ──▶ Backend
//!                      (request id,    (first      (breaker check,
//!                       trace)          match)      timeouts, gzip)
//!     Client Response
//!     ◀─────────────── http server ◀──────────── forwarding ◀──── Backend
//!
//!     Cross-cutting: config, registry, resilience, observability,
//!                    lifecycle, admin
//! ```

use std::path::PathBuf;

use clap::Parser;

use service_gateway::admin::setup_admin_router;
use service_gateway::config::load_config;
use service_gateway::lifecycle::{bind, build_gateway, spawn_signal_handler, Shutdown};
use service_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "HTTP gateway routing requests to backend services", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        connect_timeout_ms = config.upstream.connect_timeout_ms,
        read_timeout_ms = config.upstream.read_timeout_ms,
        failure_threshold = config.circuit_breaker.failure_threshold,
        reset_timeout_ms = config.circuit_breaker.reset_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let gateway = build_gateway(&config)?;
    let shutdown = Shutdown::new();
    // Subscribe before the handler exists so a signal during bind is not lost.
    let gateway_signalled = shutdown.signalled();
    let admin_signalled = shutdown.signalled();
    spawn_signal_handler(shutdown.clone());

    let admin_task = if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let app = setup_admin_router(gateway.admin_state(&config));
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(admin_signalled).await {
                tracing::error!(error = %e, "Admin server failed");
            }
        }))
    } else {
        None
    };

    let listener = bind(&config.listener.bind_address).await?;
    gateway.server().run(listener, gateway_signalled).await?;

    // The gateway can stop on its own (listener error); make sure admin follows.
    shutdown.trigger();
    if let Some(task) = admin_task {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
