//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use contracts::BridgeConfig;

use super::load_config;
use crate::bridge::{Bridge, BridgeOptions};
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, args);

    info!(
        host = %config.redis.host,
        port = config.redis.port,
        db = config.redis.db,
        channels = config.mappings.len(),
        routes = config.mappings.route_count(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let bridge = Bridge::new(BridgeOptions {
        config,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    info!("Starting bridge...");

    let stats = bridge
        .run(shutdown_signal())
        .await
        .context("Bridge execution failed")?;

    stats.print_summary();

    info!(reason = %stats.stop_reason(), "Queue Bridge finished");
    Ok(())
}

/// Apply CLI / environment overrides on top of the file configuration
fn apply_overrides(config: &mut BridgeConfig, args: &RunArgs) {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding Redis host from CLI");
        config.redis.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = %port, "Overriding Redis port from CLI");
        config.redis.port = port;
    }
    if let Some(db) = args.db {
        info!(db = %db, "Overriding Redis database from CLI");
        config.redis.db = db;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &BridgeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Redis:");
    println!("  Address: {}", config.redis.address());
    println!("  Database: {}", config.redis.db);
    println!(
        "  Password: {}",
        if config.redis.password().is_some() {
            "(set)"
        } else {
            "(none)"
        }
    );

    println!("\nMappings ({}):", config.mappings.len());
    for (channel, queues) in config.mappings.iter() {
        println!("  - {} -> {}", channel, queues.join(", "));
    }

    println!();
}
