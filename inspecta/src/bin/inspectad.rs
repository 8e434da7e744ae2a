//! INSPECTA background daemon.
//!
//! Opens the configured stores and runs queue reconciliation and lifecycle
//! scans until Ctrl-C.

use std::process::ExitCode;

use inspecta::telemetry::init_telemetry;
use inspecta::{Inspecta, InspectaConfig};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match InspectaConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("inspectad: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_telemetry(&config.telemetry) {
        eprintln!("inspectad: {}", e);
        return ExitCode::FAILURE;
    }

    let app = match Inspecta::open(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open INSPECTA");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        status = %app.get_connection_status(),
        pending = app.pending_operations().len(),
        "Starting INSPECTA daemon"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = app.spawn_background(shutdown_rx);
    let mut alerts = app.subscribe_alerts();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            changed = alerts.changed() => {
                if changed.is_err() {
                    break;
                }
                let changes = alerts.borrow_and_update().clone();
                for alert in changes.starting_soon.iter().chain(changes.ending_soon.iter()) {
                    tracing::info!(
                        mission_id = %alert.mission.id,
                        reference = %alert.mission.reference,
                        proposed = %alert.proposed_status,
                        due = alert.due,
                        "Status change awaiting approval"
                    );
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let (reconciliation, lifecycle) = tasks.join().await;
    tracing::info!(?reconciliation, ?lifecycle, "INSPECTA daemon stopped");
    ExitCode::SUCCESS
}
