use anyhow::{Context, Result};
use axum::serve;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};
use tracker_switch::api::transmission::TransmissionClient;
use tracker_switch::core::config::Config;
use tracker_switch::core::state::AppState;
use tracker_switch::core::{routes, startup, tracing_init};
use tracker_switch::reconcile::reenable::reenable_all;

/// Disable private trackers while torrents download, re-enable them once complete
#[derive(Debug, Parser)]
#[command(name = "tracker-switch", version)]
struct Cli {
    /// TOML configuration file; defaults plus environment overrides when omitted
    #[arg(short, long, env = "TRACKER_SWITCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the reconciliation loop and the control surface (default)
    Serve,
    /// Re-enable every disabled tracker on every torrent, then exit
    #[command(alias = "REENABLE_ALL")]
    ReenableAll,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing_init::init_tracing(&config.logging);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => runtime.block_on(serve_main(config)),
        Command::ReenableAll => runtime.block_on(reenable_main(config)),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = format!("{:#}", e), "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn serve_main(config: Config) -> Result<ExitCode> {
    info!(
        transmission = %config.transmission.endpoint(),
        policy_path = %config.storage.policy_path.display(),
        interval_seconds = config.reconcile.interval_secs,
        disabled_marker = %config.reconcile.disabled_marker,
        log_level = %config.logging.level,
        "Tracker switch starting"
    );
    if config.logging.level == "debug" {
        info!("Debug logging enabled");
    }

    let gateway = TransmissionClient::from_config(&config.transmission)
        .context("Failed to create Transmission client")?;
    let state = AppState::new(config.clone(), Arc::new(gateway));

    startup::prepare_policy(&state)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = state.reconciler();
    let interval = Duration::from_secs(config.reconcile.interval_secs);
    let loop_handle = tokio::spawn(async move {
        reconciler.run(interval, shutdown_rx).await;
    });

    let app = routes::build_router(Arc::new(state)).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind TCP listener to {}", addr))?;

    info!(address = %addr, "Control surface listening");

    let server_result = serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error");

    // Let an in-flight cycle finish before exiting
    let _ = shutdown_tx.send(true);
    if let Err(e) = loop_handle.await {
        error!(error = %e, "Reconciliation task failed");
    }

    server_result?;
    info!("Shut down gracefully");

    Ok(ExitCode::SUCCESS)
}

async fn reenable_main(config: Config) -> Result<ExitCode> {
    info!(
        transmission = %config.transmission.endpoint(),
        "Executing one-time re-enable of all trackers"
    );

    let gateway = TransmissionClient::from_config(&config.transmission)
        .context("Failed to create Transmission client")?;
    let state = AppState::new(config, Arc::new(gateway));

    let report = reenable_all(state.gateway.as_ref(), &state.matcher)
        .await
        .context("Could not list torrents")?;

    info!(
        scanned = report.torrents_scanned,
        succeeded = report.succeeded,
        failed = report.failed,
        trackers = report.trackers_enabled,
        "Re-enable finished"
    );

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
