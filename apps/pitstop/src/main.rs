//! PitStop reminder daemon
//!
//! Opens the local database as the configured user and checks for due-soon
//! maintenance on startup and then on a fixed interval.

use std::{sync::Arc, time::Duration};

use pitstop::{AppConfig, AppError, AppState, Notifier, StaticIdentity};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "pitstop={level},vehicle_store={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database_path.display(),
        "Starting PitStop"
    );

    let Some(uid) = config.user_uid.clone() else {
        return Err(AppError::Unauthenticated.into());
    };
    let identity = Arc::new(StaticIdentity::new(
        uid,
        config.user_email.clone().unwrap_or_default(),
    ));

    let interval_secs = config.reminder_interval_secs;
    let state = AppState::new(config, identity, notifier()).await?;

    state.users.ensure_user().await?.await?;

    // Start reminder task
    let shutdown = CancellationToken::new();
    let reminder_state = state.clone();
    let reminder_shutdown = shutdown.clone();
    let reminder_task = tokio::spawn(async move {
        // The first tick completes immediately
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            tokio::select! {
                _ = reminder_shutdown.cancelled() => break,
                _ = interval.tick() => run_reminder_check(&reminder_state).await,
            }
        }
    });

    shutdown_signal().await;

    shutdown.cancel();
    if let Err(e) = reminder_task.await {
        warn!(error = %e, "Reminder task exited abnormally");
    }
    state.shutdown().await;

    info!("PitStop shutdown complete");
    Ok(())
}

async fn run_reminder_check(state: &AppState) {
    let handle = match state.odometer.check_reminders().await {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Failed to queue reminder check");
            return;
        }
    };

    match handle.await {
        Ok(emitted) => info!(emitted, "Reminder check finished"),
        Err(e) => warn!(error = %e, "Reminder check did not complete"),
    }
}

#[cfg(all(feature = "desktop-notify", target_os = "linux"))]
fn notifier() -> Arc<dyn Notifier> {
    Arc::new(pitstop::DesktopNotifier)
}

#[cfg(not(all(feature = "desktop-notify", target_os = "linux")))]
fn notifier() -> Arc<dyn Notifier> {
    Arc::new(pitstop::LogNotifier)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
