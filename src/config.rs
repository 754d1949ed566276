//! Client configuration loading: timer cadence, buzz throttle window and transport settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "JPDY_CLIENT_CONFIG_PATH";

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1_000);
const DEFAULT_BUZZ_THROTTLE: Duration = Duration::from_millis(500);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_PROCEDURE_PREFIX: &str = "jpdy";
const DEFAULT_SESSION_PATH: &str = "jpdy_session.json";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across one client session.
pub struct ClientConfig {
    /// Interval between two countdown ticks.
    pub tick_interval: Duration,
    /// How long buzz intents are ignored after a premature buzz.
    pub buzz_throttle: Duration,
    /// Upper bound for any single transport call.
    pub call_timeout: Duration,
    /// Namespace prepended to every remote procedure name.
    pub procedure_prefix: String,
    /// File holding the persisted join data.
    pub session_path: PathBuf,
}

impl ClientConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        tick_ms = config.tick_interval.as_millis() as u64,
                        throttle_ms = config.buzz_throttle.as_millis() as u64,
                        "loaded client config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Full remote procedure name for `action` (e.g. `jpdy.buzz`).
    pub fn procedure(&self, action: &str) -> String {
        format!("{}.{}", self.procedure_prefix, action)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            buzz_throttle: DEFAULT_BUZZ_THROTTLE,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            procedure_prefix: DEFAULT_PROCEDURE_PREFIX.into(),
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    tick_interval_ms: Option<u64>,
    buzz_throttle_ms: Option<u64>,
    call_timeout_ms: Option<u64>,
    procedure_prefix: Option<String>,
    session_path: Option<PathBuf>,
}

impl From<RawConfig> for ClientConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            tick_interval: value
                .tick_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            buzz_throttle: value
                .buzz_throttle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.buzz_throttle),
            call_timeout: value
                .call_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.call_timeout),
            procedure_prefix: value
                .procedure_prefix
                .filter(|prefix| !prefix.trim().is_empty())
                .unwrap_or(defaults.procedure_prefix),
            session_path: value.session_path.unwrap_or(defaults.session_path),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
