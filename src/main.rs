//! nvidia-smi-exporter - version 0.1.0
//!
//! Prometheus exporter for nvidia-smi with tracing logging.
//! This is the main entry point that starts the sampler thread, serves
//! `/metrics` and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod state;

use axum::{routing::get, Router};
use clap::Parser;
use nvidia_smi_exporter::{GpuMetrics, Sampler, SamplerError, GPU_STATS};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal, sync::oneshot};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use cli::{Args, Commands, LogLevel};
use commands::{command_config, command_test};
use config::{resolve_config, show_config, validate_effective_config, Config};
use handlers::metrics_handler;
use state::AppState;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.log_level()?;
    let filter = match log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", log_level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Starts the sampler on its own OS thread.
///
/// The returned receiver yields the error that ended the sampling loop.
fn spawn_sampler(sampler: Sampler) -> std::io::Result<oneshot::Receiver<SamplerError>> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("sampler".into())
        .spawn(move || {
            let err = sampler.run();
            // The receiver is gone only when main is already shutting down.
            let _ = tx.send(err);
        })?;
    Ok(rx)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), format.clone(), *commented),

            Commands::Test { format } => {
                let config = load_validated_config(&args)?;
                command_test(format.clone(), &config).map_err(|e| e.into())
            }
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    setup_logging(&config)?;

    info!("Starting nvidia-smi-exporter");
    match &config.source {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }

    let addr = config.socket_addr()?;

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    debug!("Prometheus registry initialized");

    let metrics = Arc::new(GpuMetrics::new(&registry, &GPU_STATS).map_err(|e| {
        error!("Failed to register metrics: {}", e);
        e
    })?);
    debug!("All metrics registered successfully");

    // The interval is checked again here so nothing is spawned on a bad value.
    let sampler = Sampler::new(config.tool(), config.interval()?, metrics.clone())?;
    info!(
        "Sampling {} every {}s",
        config.tool().display(),
        sampler.interval_secs()
    );
    let sampler_done = spawn_sampler(sampler)?;

    let state = Arc::new(AppState {
        registry,
        metrics,
        start_time: Instant::now(),
    });

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    // Configure HTTP server routes
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind(addr).await?;
    info!("nvidia-smi-exporter listening on http://{}", addr);

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        received = sampler_done => {
            return match received {
                Ok(e) => {
                    error!("Sampler stopped: {}", e);
                    Err(e.into())
                }
                Err(_) => {
                    error!("Sampler thread exited without reporting an error");
                    Err("sampler thread exited unexpectedly".into())
                }
            };
        }
        _ = shutdown_signal => {
            info!("Shutdown signal received, exiting...");
        }
    }

    info!(
        "nvidia-smi-exporter stopped gracefully after {:.0}s",
        state.start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sampler_failure_reaches_main() {
        let registry = Registry::new();
        let metrics = Arc::new(GpuMetrics::new(&registry, &GPU_STATS).unwrap());
        let sampler =
            Sampler::new("/nonexistent/nvidia-smi", Duration::from_secs(5), metrics).unwrap();

        let err = spawn_sampler(sampler).unwrap().await.unwrap();
        assert!(matches!(err, SamplerError::Spawn { .. }));
    }
}
