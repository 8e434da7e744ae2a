//! Tracing subscriber setup.

use inspecta_core::ConfigError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), ConfigError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|e| ConfigError::InvalidValue {
            field: "telemetry.log_filter".to_string(),
            value: config.log_filter.clone(),
            reason: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ConfigError::InvalidValue {
        field: "telemetry".to_string(),
        value: String::new(),
        reason: format!("failed to install subscriber: {}", e),
    })?;

    tracing::info!(json = config.json, filter = %config.log_filter, "Telemetry initialized");
    Ok(())
}
