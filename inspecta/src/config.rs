//! Configuration loading for INSPECTA.
//!
//! The file path comes from `--config <path>` or `INSPECTA_CONFIG`. Every
//! section except `[store]` may be omitted and falls back to its defaults.
//! Unknown keys are rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;

use inspecta_core::{ActorId, ConfigError, LifecyclePolicy, SyncConfig};
use inspecta_lifecycle::LifecycleScanConfig;
use inspecta_remote::RestClientConfig;
use serde::Deserialize;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "INSPECTA_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InspectaConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub lifecycle: LifecycleSection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Recorded as `created_by` on new missions.
    #[serde(default)]
    pub actor_id: Option<ActorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// LMDB directory. Without one, the cache lives in memory for the session.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub local_fallback: bool,
    pub probe_interval_ms: u64,
    pub remote_timeout_ms: u64,
    pub mirror_reads: bool,
    pub drain_interval_ms: u64,
    pub integrity_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleSection {
    pub scan_interval_ms: u64,
    pub auto_advance: bool,
    pub planned_start_offset_hours: i64,
    pub planned_end_offset_hours: i64,
    pub ongoing_shift_hours: i64,
    pub completed_end_offset_hours: i64,
    pub starting_window_hours: i64,
    pub ending_window_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub json: bool,
}

fn default_max_size_mb() -> usize {
    256
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for SyncSection {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            local_fallback: defaults.local_fallback,
            probe_interval_ms: defaults.probe_interval.as_millis() as u64,
            remote_timeout_ms: defaults.remote_timeout.as_millis() as u64,
            mirror_reads: defaults.mirror_reads,
            drain_interval_ms: defaults.drain_interval.as_millis() as u64,
            integrity_interval_ms: defaults.integrity_interval.as_millis() as u64,
        }
    }
}

impl Default for LifecycleSection {
    fn default() -> Self {
        let policy = LifecyclePolicy::default();
        Self {
            scan_interval_ms: LifecycleScanConfig::default().scan_interval.as_millis() as u64,
            auto_advance: false,
            planned_start_offset_hours: policy.planned_start_offset.num_hours(),
            planned_end_offset_hours: policy.planned_end_offset.num_hours(),
            ongoing_shift_hours: policy.ongoing_shift.num_hours(),
            completed_end_offset_hours: policy.completed_end_offset.num_hours(),
            starting_window_hours: policy.starting_window.num_hours(),
            ending_window_hours: policy.ending_window.num_hours(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "inspecta=info,info".to_string(),
            json: false,
        }
    }
}

impl SyncSection {
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            local_fallback: self.local_fallback,
            probe_interval: Duration::from_millis(self.probe_interval_ms),
            remote_timeout: Duration::from_millis(self.remote_timeout_ms),
            mirror_reads: self.mirror_reads,
            drain_interval: Duration::from_millis(self.drain_interval_ms),
            integrity_interval: Duration::from_millis(self.integrity_interval_ms),
        }
    }
}

impl LifecycleSection {
    pub fn policy(&self) -> Result<LifecyclePolicy, ConfigError> {
        let policy = LifecyclePolicy {
            planned_start_offset: hours(
                "lifecycle.planned_start_offset_hours",
                self.planned_start_offset_hours,
            )?,
            planned_end_offset: hours(
                "lifecycle.planned_end_offset_hours",
                self.planned_end_offset_hours,
            )?,
            ongoing_shift: hours("lifecycle.ongoing_shift_hours", self.ongoing_shift_hours)?,
            completed_end_offset: hours(
                "lifecycle.completed_end_offset_hours",
                self.completed_end_offset_hours,
            )?,
            starting_window: hours("lifecycle.starting_window_hours", self.starting_window_hours)?,
            ending_window: hours("lifecycle.ending_window_hours", self.ending_window_hours)?,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn scan_config(&self) -> LifecycleScanConfig {
        LifecycleScanConfig {
            scan_interval: Duration::from_millis(self.scan_interval_ms),
            auto_advance: self.auto_advance,
        }
    }
}

impl RemoteConfig {
    pub fn client_config(&self) -> RestClientConfig {
        RestClientConfig::new(self.base_url.clone(), self.api_key.clone())
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
    }
}

impl InspectaConfig {
    /// Load from the path given by `--config` or `INSPECTA_CONFIG`, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args()
            .or_else(config_path_from_env)
            .ok_or_else(|| ConfigError::MissingRequired {
                field: format!("--config or {}", CONFIG_ENV),
            })?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: InspectaConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseFailed {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for an in-memory, local-only session.
    pub fn ephemeral() -> Self {
        Self {
            store: StoreConfig {
                path: None,
                max_size_mb: default_max_size_mb(),
            },
            remote: None,
            sync: SyncSection::default(),
            lifecycle: LifecycleSection::default(),
            telemetry: TelemetryConfig::default(),
            actor_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_size_mb == 0 {
            return Err(invalid("store.max_size_mb", self.store.max_size_mb, "must be > 0"));
        }
        if let Some(remote) = &self.remote {
            let url = remote.base_url.trim();
            if url.is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: "remote.base_url".to_string(),
                });
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid("remote.base_url", url, "must be an http(s) URL"));
            }
            if remote.api_key.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: "remote.api_key".to_string(),
                });
            }
            if remote.request_timeout_ms == 0 {
                return Err(invalid("remote.request_timeout_ms", 0, "must be > 0"));
            }
        }
        self.sync.to_sync_config().validate()?;
        if self.lifecycle.scan_interval_ms == 0 {
            return Err(invalid("lifecycle.scan_interval_ms", 0, "must be > 0"));
        }
        self.lifecycle.policy()?;
        if self.telemetry.log_filter.trim().is_empty() {
            return Err(invalid("telemetry.log_filter", "", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl std::fmt::Display, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn hours(field: &str, value: i64) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::try_hours(value).ok_or_else(|| invalid(field, value, "out of range"))
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
